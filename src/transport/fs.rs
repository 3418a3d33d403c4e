use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use futures_util::FutureExt;
use percent_encoding::percent_decode_str;

use super::{FetchError, FetchFuture, FetchRequest, Fetcher};

/// Serves a static site directory: `/x` maps to `x.html` or `x/index.html`.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    site_dir: PathBuf,
}

impl FsFetcher {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
        }
    }

    /// Candidate files for a request path, most specific first. Segments are
    /// percent-decoded; a segment that decodes to anything but a plain file
    /// name rejects the whole path.
    pub fn candidates(&self, path: &str) -> Option<Vec<PathBuf>> {
        let mut relative = PathBuf::new();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            let decoded = percent_decode_str(segment).decode_utf8().ok()?;
            let segment = Path::new(&*decoded);
            if !matches!(
                segment.components().next(),
                Some(Component::Normal(_))
            ) || segment.components().count() != 1
            {
                return None;
            }
            relative.push(segment);
        }

        let base = self.site_dir.join(&relative);
        if relative.as_os_str().is_empty() {
            return Some(vec![base.join("index.html")]);
        }
        if relative.extension().is_some() {
            return Some(vec![base]);
        }
        Some(vec![base.with_extension("html"), base.join("index.html")])
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let candidates = self.candidates(request.url.path());
        async move {
            let Some(candidates) = candidates else {
                return Err(FetchError::status(400));
            };
            for candidate in candidates {
                match tokio::fs::read_to_string(&candidate).await {
                    Ok(markup) => return Ok(markup),
                    Err(err) if err.kind() == ErrorKind::NotFound => continue,
                    Err(err) => {
                        return Err(FetchError::transport(format!(
                            "{}: {err}",
                            candidate.display()
                        )));
                    }
                }
            }
            Err(FetchError::status(404))
        }
        .boxed_local()
    }
}
