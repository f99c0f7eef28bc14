// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const ITEMS: &str = "/items";
pub const ITEM: &str = "/items/{id}";

const ITEM_PREFIX: &str = "/items/";

/// The operation selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Preflight,
    Create,
    List,
    Read(Option<&'a str>),
    Update(Option<&'a str>),
    Delete(Option<&'a str>),
    NotHandled,
}

impl<'a> Route<'a> {
    /// Resolve a method and path against the fixed route table.
    ///
    /// Order matters: `/health` wins over everything, then any `OPTIONS`.
    /// Item routes carry `None` when the path starts with `/items/` but the
    /// identifier does not match `[A-Za-z0-9_.-]+`.
    pub fn resolve(method: &str, path: &'a str) -> Route<'a> {
        if path == HEALTH {
            return Route::Health;
        }
        if method == "OPTIONS" {
            return Route::Preflight;
        }

        match (method, path) {
            ("POST", ITEMS) => Route::Create,
            ("GET", ITEMS) => Route::List,
            ("GET", p) if p.starts_with(ITEM_PREFIX) => Route::Read(item_id(p)),
            ("PUT", p) if p.starts_with(ITEM_PREFIX) => Route::Update(item_id(p)),
            ("DELETE", p) if p.starts_with(ITEM_PREFIX) => Route::Delete(item_id(p)),
            _ => Route::NotHandled,
        }
    }
}

/// Extract the identifier from `/items/{id}`, anchored on the whole path
pub fn item_id(path: &str) -> Option<&str> {
    let id = path.strip_prefix(ITEM_PREFIX)?;
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    valid.then_some(id)
}
