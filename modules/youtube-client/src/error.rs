use thiserror::Error;

pub type Result<T> = std::result::Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for YouTubeError {
    fn from(err: reqwest::Error) -> Self {
        YouTubeError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for YouTubeError {
    fn from(err: serde_json::Error) -> Self {
        YouTubeError::Parse(err.to_string())
    }
}

/// Failure modes of the caption retrieval chain. A video that simply has no
/// captions is not an error; these cover the cases where retrieval itself
/// broke down and the result should not be cached as "no transcript".
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Player API caption discovery failed before transcript parsing (attempts={attempts}, network_errors={network_errors}, statuses={statuses})")]
    DiscoveryFailed {
        attempts: u32,
        network_errors: u32,
        statuses: String,
    },

    #[error("Player API responded without captionTracks (ok_no_tracks={ok_no_tracks}, attempts={attempts})")]
    PlayerNoTracks { ok_no_tracks: u32, attempts: u32 },

    #[error("Caption tracks found (watch={watch_tracks}, player={player_tracks}), but transcript payload was empty for all retrieval paths")]
    EmptyTranscript {
        watch_tracks: usize,
        player_tracks: usize,
    },
}
