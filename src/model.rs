use ::std::collections::HashMap;

/// Direction of a vote on a news item or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

/// A news item as read from the store, plus the enrichment fields computed
/// at read time (`username`, `voted`). Enrichment is never written back.
#[derive(Debug, Clone, ::serde::Serialize)]
pub struct News {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub user_id: u64,
    pub ctime: i64,
    pub score: f64,
    pub rank: f64,
    pub up: u64,
    pub down: u64,
    pub comments: u64,
    pub del: bool,

    pub username: Option<String>,
    pub voted: Option<VoteDirection>,
}

/// Marker scheme used for inline text posts, stored in the url field.
pub const TEXT_URL_PREFIX: &str = "text://";

impl News {
    /// Parse a stored hash into a typed record. Returns `None` for an empty
    /// map (missing key) so hydration can filter vanished ids.
    pub fn from_map(map: &HashMap<String, String>) -> Option<News> {
        if map.is_empty() {
            return None;
        }
        Some(News {
            id: field_u64(map, "id")?,
            title: field_string(map, "title"),
            url: field_string(map, "url"),
            user_id: field_u64(map, "user_id").unwrap_or(0),
            ctime: field_i64(map, "ctime"),
            score: field_f64(map, "score"),
            rank: field_f64(map, "rank"),
            up: field_u64(map, "up").unwrap_or(0),
            down: field_u64(map, "down").unwrap_or(0),
            comments: field_u64(map, "comments").unwrap_or(0),
            del: field_flag(map, "del"),
            username: None,
            voted: None,
        })
    }

    /// Host part of the news URL, `None` for inline text posts.
    pub fn domain(&self) -> Option<String> {
        if self.is_text_post() {
            return None;
        }
        ::url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }

    /// Inline text of a text post, `None` for URL posts.
    pub fn text(&self) -> Option<&str> {
        self.url.strip_prefix(TEXT_URL_PREFIX)
    }

    pub fn is_text_post(&self) -> bool {
        self.url.starts_with(TEXT_URL_PREFIX)
    }
}

/// A registered user. The salt and password hash are opaque to the engine:
/// hashing happens in the excluded authentication layer.
#[derive(Debug, Clone, ::serde::Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub salt: String,
    pub password: String,
    pub ctime: i64,
    pub karma: i64,
    pub about: String,
    pub email: String,
    pub auth: String,
    pub apisecret: String,
    pub flags: String,
    pub karma_incr_time: i64,
    pub replies: u64,
}

impl User {
    pub fn from_map(map: &HashMap<String, String>) -> Option<User> {
        if map.is_empty() {
            return None;
        }
        Some(User {
            id: field_u64(map, "id")?,
            username: field_string(map, "username"),
            salt: field_string(map, "salt"),
            password: field_string(map, "password"),
            ctime: field_i64(map, "ctime"),
            karma: field_i64(map, "karma"),
            about: field_string(map, "about"),
            email: field_string(map, "email"),
            auth: field_string(map, "auth"),
            apisecret: field_string(map, "apisecret"),
            flags: field_string(map, "flags"),
            karma_incr_time: field_i64(map, "karma_incr_time"),
            replies: field_u64(map, "replies").unwrap_or(0),
        })
    }

    /// True if the user carries every flag in `flags`.
    ///
    /// Current flags: 'a' administrator, 'k' karma source (may transfer
    /// more karma than owned), 'n' open links in a new window.
    pub fn has_flags(&self, flags: &str) -> bool {
        flags.chars().all(|f| self.flags.contains(f))
    }

    pub fn is_admin(&self) -> bool {
        self.has_flags("a")
    }
}

/// A comment, identified by (thread id, per-thread sequence number).
/// Stored as a JSON blob inside the thread's comment hash; the identity
/// pair lives in the key/field and is re-attached on fetch.
#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct Comment {
    #[serde(skip)]
    pub thread_id: u64,
    #[serde(skip)]
    pub id: u64,
    pub parent_id: i64,
    pub user_id: u64,
    pub ctime: i64,
    pub body: String,
    #[serde(default)]
    pub up: Vec<u64>,
    #[serde(default)]
    pub down: Vec<u64>,
    #[serde(default)]
    pub del: bool,
}

impl Comment {
    /// Net comment score: up-voters minus down-voters, no volume bonus.
    pub fn score(&self) -> i64 {
        self.up.len() as i64 - self.down.len() as i64
    }
}

/// Sentinel parent id of a top-level comment.
pub const TOP_LEVEL_PARENT: i64 = -1;

/// Per-request context: the authenticated identity (if any), the
/// originating address, and the request's wall-clock time. Operations that
/// mutate the identity's counters mirror the change here so later reads in
/// the same request see it without a re-fetch.
#[derive(Debug, Clone)]
pub struct Context {
    pub user: Option<User>,
    pub remote_addr: String,
    pub now: i64,
}

impl Context {
    pub fn anonymous(remote_addr: impl Into<String>, now: i64) -> Context {
        Context {
            user: None,
            remote_addr: remote_addr.into(),
            now,
        }
    }

    pub fn authenticated(user: User, remote_addr: impl Into<String>, now: i64) -> Context {
        Context {
            user: Some(user),
            remote_addr: remote_addr.into(),
            now,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.is_admin()).unwrap_or(false)
    }

    pub fn require_user(&self) -> crate::error::Result<&User> {
        self.user.as_ref().ok_or(crate::error::Error::PermissionDenied)
    }
}

/// Aggregate counters for the site front page footer.
#[derive(Debug, Clone, Copy, ::serde::Serialize)]
pub struct SiteStats {
    pub users: u64,
    pub news: u64,
}

fn field_string(map: &HashMap<String, String>, field: &str) -> String {
    map.get(field).cloned().unwrap_or_default()
}

fn field_u64(map: &HashMap<String, String>, field: &str) -> Option<u64> {
    map.get(field).and_then(|v| v.parse().ok())
}

fn field_i64(map: &HashMap<String, String>, field: &str) -> i64 {
    map.get(field).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn field_f64(map: &HashMap<String, String>, field: &str) -> f64 {
    map.get(field).and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

fn field_flag(map: &HashMap<String, String>, field: &str) -> bool {
    matches!(map.get(field).map(|v| v.as_str()), Some("1") | Some("true"))
}
