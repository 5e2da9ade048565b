//! spotDL-backed media source.
//!
//! Every operation shells out to the `spotdl` executable:
//! - connect: `spotdl --version`
//! - search: `spotdl save <url> --save-file <tmp>.spotdl`, then parse the JSON
//! - download: one `spotdl download <track url> --output <dir> ...` per track
//!
//! A non-zero exit is classified from the process output with
//! [`SourceError::classify`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DownloadReport, FailedTrack, MediaSource, SourceConnector, SourceError, Track};

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_CHARS: usize = 500;

/// Settings for invoking spotDL.
#[derive(Debug, Clone)]
pub struct SpotdlConfig {
    pub binary: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub audio_format: String,
    pub bitrate: String,
    /// Upper bound for a single spotDL invocation.
    pub timeout: Duration,
}

impl Default for SpotdlConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("spotdl"),
            client_id: None,
            client_secret: None,
            cookie_file: None,
            audio_format: "mp3".to_string(),
            bitrate: "320k".to_string(),
            timeout: Duration::from_secs(3600),
        }
    }
}

impl SpotdlConfig {
    /// Credential flags appended to every `save`/`download` invocation.
    fn credential_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(id) = &self.client_id {
            args.push("--client-id".into());
            args.push(id.into());
        }
        if let Some(secret) = &self.client_secret {
            args.push("--client-secret".into());
            args.push(secret.into());
        }
        if let Some(cookies) = &self.cookie_file {
            args.push("--cookie-file".into());
            args.push(cookies.into());
        }
        args
    }

    fn save_args(&self, url: &str, save_file: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "save".into(),
            url.into(),
            "--save-file".into(),
            save_file.into(),
        ];
        args.extend(self.credential_args());
        args
    }

    fn download_args(&self, track: &Track, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "download".into(),
            track.url.as_str().into(),
            "--output".into(),
            output_dir.into(),
            "--format".into(),
            self.audio_format.as_str().into(),
            "--bitrate".into(),
            self.bitrate.as_str().into(),
        ];
        args.extend(self.credential_args());
        args
    }
}

/// Connects by checking that the spotDL executable runs.
#[derive(Debug, Clone)]
pub struct SpotdlConnector {
    config: SpotdlConfig,
}

impl SpotdlConnector {
    pub fn new(config: SpotdlConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceConnector for SpotdlConnector {
    async fn connect(&self) -> Result<Arc<dyn MediaSource>, SourceError> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--version");

        let output = run(cmd, VERSION_CHECK_TIMEOUT).await.map_err(|e| {
            SourceError::fatal(format!(
                "spotdl is not available at {}: {}",
                self.config.binary.display(),
                e.message()
            ))
        })?;

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(binary = %self.config.binary.display(), %version, "spotdl available");

        Ok(Arc::new(SpotdlSource {
            config: self.config.clone(),
        }))
    }
}

/// A verified spotDL installation.
#[derive(Debug)]
pub struct SpotdlSource {
    config: SpotdlConfig,
}

impl SpotdlSource {
    fn command(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args);
        cmd
    }

    async fn save_and_parse(&self, cmd: Command, save_file: &Path) -> Result<Vec<Track>, SourceError> {
        run(cmd, self.config.timeout).await?;
        let bytes = tokio::fs::read(save_file)
            .await
            .map_err(|e| SourceError::transient(format!("spotdl produced no song list: {e}")))?;
        parse_saved_songs(&bytes)
    }
}

#[async_trait]
impl MediaSource for SpotdlSource {
    async fn search(&self, url: &str) -> Result<Vec<Track>, SourceError> {
        let save_file = std::env::temp_dir().join(format!("plexsync-{}.spotdl", Uuid::now_v7()));
        let cmd = self.command(self.config.save_args(url, &save_file));

        let result = self.save_and_parse(cmd, &save_file).await;

        if let Err(e) = tokio::fs::remove_file(&save_file).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %save_file.display(), error = %e, "failed to remove spotdl save file");
            }
        }

        result
    }

    async fn download(&self, tracks: &[Track], output_dir: &Path) -> Result<DownloadReport, SourceError> {
        let mut report = DownloadReport::default();

        for track in tracks {
            let cmd = self.command(self.config.download_args(track, output_dir));
            match run(cmd, self.config.timeout).await {
                Ok(_) => {
                    debug!(track = %track, "track downloaded");
                    report.succeeded.push(track.clone());
                }
                Err(error) => {
                    warn!(track = %track, error = %error, "track download failed");
                    report.failed.push(FailedTrack {
                        track: track.clone(),
                        error,
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Run a command to completion, killing it if `timeout` elapses.
async fn run(mut cmd: Command, timeout: Duration) -> Result<Output, SourceError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::fatal(format!("executable not found: {e}")));
        }
        Ok(Err(e)) => return Err(SourceError::transient(format!("failed to run spotdl: {e}"))),
        Err(_) => {
            return Err(SourceError::transient(format!("spotdl timed out after {timeout:?}")));
        }
    };

    if output.status.success() {
        Ok(output)
    } else {
        Err(SourceError::classify(None, failure_text(&output)))
    }
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    let text = tail(text.trim(), MAX_ERROR_CHARS);

    if text.is_empty() {
        format!("spotdl exited with {}", output.status)
    } else {
        text.to_string()
    }
}

/// Last `max` characters of `s`.
fn tail(s: &str, max: usize) -> &str {
    match s.char_indices().rev().nth(max.saturating_sub(1)) {
        Some((idx, _)) if max > 0 => &s[idx..],
        _ if max == 0 => "",
        _ => s,
    }
}

#[derive(Debug, Deserialize)]
struct SavedSong {
    name: String,
    #[serde(default)]
    artists: Vec<String>,
    url: String,
}

/// Parse the JSON array written by `spotdl save`.
fn parse_saved_songs(bytes: &[u8]) -> Result<Vec<Track>, SourceError> {
    let songs: Vec<SavedSong> = serde_json::from_slice(bytes)
        .map_err(|e| SourceError::fatal(format!("unexpected spotdl song list: {e}")))?;

    Ok(songs
        .into_iter()
        .map(|s| Track::new(s.name, s.artists, s.url))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_saved_song_list() {
        let json = br#"[
            {"name": "Song A", "artists": ["X", "Y"], "url": "https://open.spotify.com/track/a", "duration": 200},
            {"name": "Song B", "url": "https://open.spotify.com/track/b"}
        ]"#;

        let tracks = parse_saved_songs(json).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].to_string(), "X, Y - Song A");
        assert!(tracks[1].artists.is_empty());
    }

    #[test]
    fn malformed_song_list_is_fatal() {
        assert!(parse_saved_songs(b"{not json").unwrap_err().is_fatal());
    }

    #[test]
    fn download_args_carry_format_and_credentials() {
        let config = SpotdlConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            cookie_file: Some(PathBuf::from("/cookies.txt")),
            ..SpotdlConfig::default()
        };
        let track = Track::new("a", vec![], "https://open.spotify.com/track/a");

        let args = config.download_args(&track, Path::new("/music"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "download",
                "https://open.spotify.com/track/a",
                "--output",
                "/music",
                "--format",
                "mp3",
                "--bitrate",
                "320k",
                "--client-id",
                "id",
                "--client-secret",
                "secret",
                "--cookie-file",
                "/cookies.txt",
            ]
        );
    }

    #[test]
    fn save_args_without_credentials() {
        let config = SpotdlConfig::default();
        let args = config.save_args("https://open.spotify.com/album/x", Path::new("/tmp/x.spotdl"));
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], "save");
    }

    #[test]
    fn tail_keeps_last_chars() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 5), "ab");
        assert_eq!(tail("ééé", 2), "éé");
        assert_eq!(tail("abc", 0), "");
    }

    #[tokio::test]
    async fn connect_fails_fatally_without_binary() {
        let connector = SpotdlConnector::new(SpotdlConfig {
            binary: PathBuf::from("/definitely/not/here/spotdl"),
            ..SpotdlConfig::default()
        });

        let err = connector.connect().await.err().unwrap();
        assert!(err.is_fatal());
        assert!(err.message().contains("not available"));
    }

    /// Stand-in for the spotdl executable.
    ///
    /// Links containing `limited` fail with a throttling message, links
    /// containing `slow` take a second and then leave a `finished` marker.
    /// `save` records the save-file path it was given in `last_save`.
    #[cfg(unix)]
    const FAKE_SPOTDL: &str = r#"#!/bin/sh
dir=$(dirname "$0")
throttled() {
    echo "HTTP Error 429: Too Many Requests. Retry will occur after: 120 s" >&2
    exit 1
}
case "$1" in
    --version) echo "4.2.5" ;;
    save)
        echo "$4" > "$dir/last_save"
        case "$2" in *limited*) throttled ;; esac
        printf '[{"name": "Song", "artists": ["Band"], "url": "https://open.spotify.com/track/a"}]' > "$4"
        ;;
    download)
        case "$2" in
            *limited*) throttled ;;
            *slow*) sleep 1; touch "$dir/finished" ;;
        esac
        ;;
esac
"#;

    #[cfg(unix)]
    async fn fake_source(dir: &Path, timeout: Duration) -> Arc<dyn MediaSource> {
        use std::os::unix::fs::PermissionsExt;

        let binary = dir.join("spotdl");
        std::fs::write(&binary, FAKE_SPOTDL).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        SpotdlConnector::new(SpotdlConfig {
            binary,
            timeout,
            ..SpotdlConfig::default()
        })
        .connect()
        .await
        .unwrap()
    }

    #[cfg(unix)]
    fn recorded_save_file(dir: &Path) -> PathBuf {
        PathBuf::from(std::fs::read_to_string(dir.join("last_save")).unwrap().trim())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn search_reads_save_file_and_removes_it() {
        let bin = tempfile::tempdir().unwrap();
        let source = fake_source(bin.path(), Duration::from_secs(10)).await;

        let tracks = source.search("https://open.spotify.com/album/x").await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].to_string(), "Band - Song");

        let save_file = recorded_save_file(bin.path());
        assert_eq!(save_file.extension().unwrap(), "spotdl");
        assert!(!save_file.exists(), "{} left behind", save_file.display());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn throttled_search_is_rate_limited() {
        let bin = tempfile::tempdir().unwrap();
        let source = fake_source(bin.path(), Duration::from_secs(10)).await;

        let err = source
            .search("https://open.spotify.com/playlist/limited")
            .await
            .unwrap_err();
        assert!(err.is_rate_limited(), "{err}");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
        assert!(!recorded_save_file(bin.path()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn throttled_download_is_reported_per_track() {
        let bin = tempfile::tempdir().unwrap();
        let music = tempfile::tempdir().unwrap();
        let source = fake_source(bin.path(), Duration::from_secs(10)).await;
        let tracks = [
            Track::new("ok", vec![], "https://open.spotify.com/track/ok"),
            Track::new("limited", vec![], "https://open.spotify.com/track/limited"),
        ];

        let report = source.download(&tracks, music.path()).await.unwrap();
        assert_eq!(report.succeeded, vec![tracks[0].clone()]);
        assert_eq!(report.failed.len(), 1);
        let error = &report.failed[0].error;
        assert!(error.is_rate_limited(), "{error}");
        assert!(error.message().contains("HTTP Error 429"));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(120)));

        let err = source
            .download(&tracks[1..], music.path())
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_download_is_killed_as_transient() {
        let bin = tempfile::tempdir().unwrap();
        let music = tempfile::tempdir().unwrap();
        let source = fake_source(bin.path(), Duration::from_millis(200)).await;
        let slow = [Track::new("slow", vec![], "https://open.spotify.com/track/slow")];

        let started = std::time::Instant::now();
        let report = source.download(&slow, music.path()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        let error = &report.failed[0].error;
        assert!(matches!(error, SourceError::Transient(_)), "{error}");
        assert!(error.message().contains("timed out"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!bin.path().join("finished").exists(), "spotdl kept running after the timeout");
    }
}
