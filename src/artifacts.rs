//! Deterministic artifact locations derived from the run id.
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Script,
    Chart,
    Video,
}

impl ArtifactKind {
    fn dir(self) -> &'static str {
        match self {
            ArtifactKind::Script => "scripts",
            ArtifactKind::Chart => "charts",
            ArtifactKind::Video => "videos",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Script => "script.md",
            ArtifactKind::Chart => "chart.png",
            ArtifactKind::Video => "video.mp4",
        }
    }
}

/// Layout of every artifact a run writes under one assets root.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    root: PathBuf,
    run_id: String,
}

impl ArtifactPaths {
    pub fn new(root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            run_id: run_id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<dir>/<run_id>_<ticker>_<suffix>`
    pub fn path(&self, kind: ArtifactKind, ticker: &str) -> PathBuf {
        self.root.join(kind.dir()).join(format!(
            "{}_{}_{}",
            file_component(&self.run_id),
            file_component(ticker),
            kind.suffix()
        ))
    }

    /// Explicit path when given, otherwise the derived one.
    pub fn resolve(&self, explicit: Option<&Path>, kind: ArtifactKind, ticker: &str) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.path(kind, ticker))
    }
}

fn file_component(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_derived_from_run_id_and_ticker() {
        let paths = ArtifactPaths::new("assets", "abc123");
        assert_eq!(
            paths.path(ArtifactKind::Script, "7203.T"),
            PathBuf::from("assets/scripts/abc123_7203.T_script.md")
        );
        assert_eq!(
            paths.path(ArtifactKind::Chart, "^N225"),
            PathBuf::from("assets/charts/abc123_^N225_chart.png")
        );
        assert_eq!(
            paths.path(ArtifactKind::Video, "6758.T"),
            PathBuf::from("assets/videos/abc123_6758.T_video.mp4")
        );
    }

    #[test]
    fn distinct_runs_never_collide() {
        let a = ArtifactPaths::new("assets", "run-a").path(ArtifactKind::Script, "7203.T");
        let b = ArtifactPaths::new("assets", "run-b").path(ArtifactKind::Script, "7203.T");
        assert_ne!(a, b);
    }

    #[test]
    fn separators_in_components_are_neutralized() {
        let path = ArtifactPaths::new("assets", "a/b").path(ArtifactKind::Script, "X/Y");
        assert_eq!(path, PathBuf::from("assets/scripts/a_b_X_Y_script.md"));
    }

    #[test]
    fn explicit_path_wins() {
        let paths = ArtifactPaths::new("assets", "r");
        let explicit = PathBuf::from("/tmp/out.md");
        assert_eq!(
            paths.resolve(Some(&explicit), ArtifactKind::Script, "T"),
            explicit
        );
        assert_eq!(
            paths.resolve(None, ArtifactKind::Script, "T"),
            PathBuf::from("assets/scripts/r_T_script.md")
        );
    }
}
