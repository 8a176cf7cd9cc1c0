//! Research blocks
//!
//! Product, competitor, hashtag, sound and post-performance lookups. These
//! produce synthesized research text from their configured query and do not
//! read upstream data.
//!
//! # Outputs
//! - `shop_scraper` → `products`
//! - `competitor_spy` → `videos`
//! - `hashtag_analyzer` → `hashtag_data`
//! - `sound_tracker` → `sounds`
//! - `analytics_check` → `metrics`

use pipeline_engine::DispatchRequest;

use crate::text::{ModelPolicy, Prompt, TextBlock, DEFAULT_TEXT_MODEL};

pub const SHOP_SCRAPER: TextBlock = TextBlock {
    block_id: "shop_scraper",
    outputs: &["products"],
    model: ModelPolicy::Fixed(DEFAULT_TEXT_MODEL),
    prompt: shop_scraper_prompt,
};

pub const COMPETITOR_SPY: TextBlock = TextBlock {
    block_id: "competitor_spy",
    outputs: &["videos"],
    model: ModelPolicy::Fixed(DEFAULT_TEXT_MODEL),
    prompt: competitor_spy_prompt,
};

pub const HASHTAG_ANALYZER: TextBlock = TextBlock {
    block_id: "hashtag_analyzer",
    outputs: &["hashtag_data"],
    model: ModelPolicy::Fixed(DEFAULT_TEXT_MODEL),
    prompt: hashtag_analyzer_prompt,
};

pub const SOUND_TRACKER: TextBlock = TextBlock {
    block_id: "sound_tracker",
    outputs: &["sounds"],
    model: ModelPolicy::Fixed(DEFAULT_TEXT_MODEL),
    prompt: sound_tracker_prompt,
};

pub const ANALYTICS_CHECK: TextBlock = TextBlock {
    block_id: "analytics_check",
    outputs: &["metrics"],
    model: ModelPolicy::Fixed(DEFAULT_TEXT_MODEL),
    prompt: analytics_check_prompt,
};

/// All research blocks
pub const RESEARCH_BLOCKS: [TextBlock; 5] = [
    SHOP_SCRAPER,
    COMPETITOR_SPY,
    HASHTAG_ANALYZER,
    SOUND_TRACKER,
    ANALYTICS_CHECK,
];

fn shop_scraper_prompt(request: &DispatchRequest) -> Prompt {
    let count = request.config_or("count", "5");
    Prompt::new(
        format!(
            "You research TikTok Shop products. Produce realistic trending product data for the \
             search keyword: product name, price, estimated daily sales, rating and a short \
             description. Answer as a numbered list of {} products.",
            count
        ),
        format!(
            "Search keyword: \"{}\" | Category: {} | List {} trending products.",
            request.config_or("keyword", "trending"),
            request.config_or("category", "All"),
            count
        ),
    )
}

fn competitor_spy_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        "You analyze TikTok competitors. Produce performance data for the account: video title, \
         views, likes, engagement rate, posting time and the tactics behind each video. Answer \
         as a table.",
        format!(
            "Account: @{} | Minimum views: {} | Write the performance report.",
            request.config_or("username", "competitor"),
            request.config_or("min_views", "10K")
        ),
    )
}

fn hashtag_analyzer_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        "You research TikTok hashtags. For the hashtag report total views, growth rate, a summary \
         of the top posts, related hashtags and the best time to post.",
        format!(
            "Hashtag: #{} | Top {} posts.",
            request.config_or("hashtag", "trending"),
            request.config_or("count", "5")
        ),
    )
}

fn sound_tracker_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        "You track TikTok sound trends. For the niche list trending sounds with sound name, \
         artist, usage count, growth trend and the video formats each sound suits.",
        format!(
            "Niche: \"{}\" | List 5 trending sounds.",
            request.config_or("niche", "general")
        ),
    )
}

fn analytics_check_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        "You analyze TikTok account performance. Write a realistic report covering views, likes, \
         shares, comments, follower growth, the best performing video, engagement rate and \
         recommendations.",
        format!(
            "Account: @{} | Checked after: {} | Write the analytics report.",
            request.config_or("username", "creator"),
            request.config_or("hours_after", "24h")
        ),
    )
}
