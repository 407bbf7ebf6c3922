use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{HarnessError, Result, ServerKind};

/// Candidate server configuration files, one per server family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfigFiles {
    pub iis: PathBuf,
    pub nginx: PathBuf,
}

impl ServerConfigFiles {
    pub fn new(iis: impl Into<PathBuf>, nginx: impl Into<PathBuf>) -> Self {
        Self {
            iis: iis.into(),
            nginx: nginx.into(),
        }
    }

    /// Both file names resolved relative to `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, iis: &str, nginx: &str) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(iis), dir.join(nginx))
    }

    /// File that applies to `server`, if the server needs one.
    pub fn path_for(&self, server: ServerKind) -> Option<&Path> {
        match server {
            ServerKind::IisExpress | ServerKind::Iis => Some(self.iis.as_path()),
            ServerKind::Nginx => Some(self.nginx.as_path()),
            ServerKind::Kestrel | ServerKind::HttpSys => None,
        }
    }

    /// Text content of the file for `server`, or `None` when the server needs none.
    pub fn content_for(&self, server: ServerKind) -> Result<Option<String>> {
        let Some(path) = self.path_for(server) else {
            return Ok(None);
        };
        fs::read_to_string(path).map(Some).map_err(|err| {
            HarnessError::Config(format!(
                "could not read {server} config '{}': {err}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::ServerConfigFiles;
    use crate::{HarnessError, ServerKind};

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!("hosting-harness-{tag}-{nanos}"));
        fs::create_dir_all(&dir).expect("must create scratch dir");
        dir
    }

    #[test]
    fn picks_file_by_server_family() {
        let dir = scratch_dir("family");
        fs::write(dir.join("Http.config"), "<configuration />").expect("write iis");
        fs::write(dir.join("nginx.conf"), "events {}").expect("write nginx");
        let files = ServerConfigFiles::in_dir(&dir, "Http.config", "nginx.conf");

        assert_eq!(
            files.content_for(ServerKind::Iis).expect("iis"),
            Some("<configuration />".to_owned())
        );
        assert_eq!(
            files.content_for(ServerKind::IisExpress).expect("iis express"),
            Some("<configuration />".to_owned())
        );
        assert_eq!(
            files.content_for(ServerKind::Nginx).expect("nginx"),
            Some("events {}".to_owned())
        );
        assert_eq!(files.content_for(ServerKind::Kestrel).expect("kestrel"), None);
        assert_eq!(files.content_for(ServerKind::HttpSys).expect("httpsys"), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = scratch_dir("missing");
        let files = ServerConfigFiles::in_dir(&dir, "absent.config", "absent.conf");

        let err = files
            .content_for(ServerKind::Nginx)
            .expect_err("missing file must fail");
        assert!(matches!(err, HarnessError::Config(_)));
        assert_eq!(files.content_for(ServerKind::Kestrel).expect("no file needed"), None);

        let _ = fs::remove_dir_all(dir);
    }
}
