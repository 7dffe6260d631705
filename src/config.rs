use ::envconfig::Envconfig;

/// Tunables of the ranking, karma and throttling economy.
///
/// Every knob can be overridden from the environment; the defaults are the
/// values the engine is normally run with.
#[derive(::envconfig::Envconfig, Clone, Debug)]
pub struct Config {
    // -- Karma --
    #[envconfig(from = "USER_INITIAL_KARMA", default = "1")]
    pub user_initial_karma: i64,

    #[envconfig(from = "KARMA_INCREMENT_INTERVAL", default = "10800")]
    pub karma_increment_interval: i64,

    #[envconfig(from = "KARMA_INCREMENT_AMOUNT", default = "1")]
    pub karma_increment_amount: i64,

    #[envconfig(from = "NEWS_UPVOTE_MIN_KARMA", default = "1")]
    pub upvote_min_karma: i64,

    #[envconfig(from = "NEWS_DOWNVOTE_MIN_KARMA", default = "30")]
    pub downvote_min_karma: i64,

    #[envconfig(from = "NEWS_UPVOTE_KARMA_COST", default = "1")]
    pub upvote_karma_cost: i64,

    #[envconfig(from = "NEWS_UPVOTE_KARMA_TRANSFER", default = "1")]
    pub upvote_karma_transfer: i64,

    #[envconfig(from = "NEWS_DOWNVOTE_KARMA_COST", default = "6")]
    pub downvote_karma_cost: i64,

    // -- Score and rank --
    #[envconfig(from = "NEWS_SCORE_LOG_START", default = "10")]
    pub score_log_start: u64,

    #[envconfig(from = "NEWS_SCORE_LOG_BOOSTER", default = "2")]
    pub score_log_booster: f64,

    #[envconfig(from = "NEWS_AGE_PADDING", default = "28800")]
    pub age_padding: i64,

    #[envconfig(from = "RANK_AGING_FACTOR", default = "2.2")]
    pub aging_factor: f64,

    #[envconfig(from = "TOP_NEWS_AGE_LIMIT", default = "2592000")]
    pub top_age_limit: i64,

    // -- Edit and throttle windows (seconds) --
    #[envconfig(from = "NEWS_EDIT_TIME", default = "900")]
    pub news_edit_time: i64,

    #[envconfig(from = "COMMENT_EDIT_TIME", default = "7200")]
    pub comment_edit_time: i64,

    #[envconfig(from = "PREVENT_REPOST_TIME", default = "172800")]
    pub prevent_repost_time: i64,

    #[envconfig(from = "NEWS_SUBMISSION_BREAK", default = "900")]
    pub news_submission_break: i64,

    #[envconfig(from = "CREATE_USER_WINDOW", default = "54000")]
    pub create_user_window: i64,

    // -- Limits and page sizes --
    #[envconfig(from = "COMMENT_MAX_LENGTH", default = "4096")]
    pub comment_max_length: usize,

    #[envconfig(from = "TOP_NEWS_PER_PAGE", default = "30")]
    pub top_news_per_page: u64,

    #[envconfig(from = "LATEST_NEWS_PER_PAGE", default = "100")]
    pub latest_news_per_page: u64,

    #[envconfig(from = "SAVED_NEWS_PER_PAGE", default = "10")]
    pub saved_news_per_page: u64,

    #[envconfig(from = "USER_COMMENTS_PER_PAGE", default = "10")]
    pub user_comments_per_page: u64,

    #[envconfig(from = "SUBTHREADS_IN_REPLIES_PAGE", default = "10")]
    pub subthreads_in_replies_page: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_initial_karma: 1,
            karma_increment_interval: 10800,
            karma_increment_amount: 1,
            upvote_min_karma: 1,
            downvote_min_karma: 30,
            upvote_karma_cost: 1,
            upvote_karma_transfer: 1,
            downvote_karma_cost: 6,
            score_log_start: 10,
            score_log_booster: 2.0,
            age_padding: 28800,
            aging_factor: 2.2,
            top_age_limit: 2592000,
            news_edit_time: 900,
            comment_edit_time: 7200,
            prevent_repost_time: 172800,
            news_submission_break: 900,
            create_user_window: 54000,
            comment_max_length: 4096,
            top_news_per_page: 30,
            latest_news_per_page: 100,
            saved_news_per_page: 10,
            user_comments_per_page: 10,
            subthreads_in_replies_page: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ::envconfig::Error> {
        Self::init_from_env()
    }
}
