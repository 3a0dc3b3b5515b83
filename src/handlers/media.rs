//! Serves stored uploads from `MEDIA_ROOT` at the path of `MEDIA_BASE_URL`.

use std::path::PathBuf;

use actix_files::Files;
use actix_web::web;

#[derive(Debug, Clone)]
pub struct MediaMount {
    /// URL path prefix, e.g. `/uploads`.
    pub path: String,
    /// Must exist before the app is built.
    pub root: PathBuf,
}

impl MediaMount {
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.service(Files::new(&self.path, &self.root));
    }
}
