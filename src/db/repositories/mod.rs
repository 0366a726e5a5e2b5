mod cache;
mod drafts;
mod history;
mod prefs;

pub use cache::CACHE_TTL_MINUTES;
