use reqwest::StatusCode;
use thiserror::Error;

use crate::parser::Protocol;

#[derive(Error, Debug)]
pub enum BakeryError {
    #[error("parsing filter key {key}: {reason}")]
    FilterParse { key: String, reason: String },

    #[error("decoding rendition url: {0}")]
    RenditionDecode(String),

    #[error("trim is not supported for {0} manifests")]
    TrimUnsupported(Protocol),

    #[error("unable to detect manifest protocol from url")]
    UnknownProtocol,

    #[error("url path does not follow /propeller/<orgID>/<channelID>.m3u8: {0}")]
    PropellerPath(String),

    #[error("propeller origin requested but propeller is not configured")]
    PropellerNotConfigured,

    #[error("channel {org_id}/{channel_id} not found")]
    ChannelNotFound { org_id: String, channel_id: String },

    #[error("fetching channel from propeller: status {0}")]
    PropellerStatus(StatusCode),

    #[error("propeller channel has no playback url")]
    ChannelWithoutPlayback,

    #[error("fetching manifest: upstream returned {0}")]
    UpstreamStatus(StatusCode),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("invalid m3u8 manifest: {0}")]
    PlaylistDecode(String),

    #[error(transparent)]
    MpdDecode(#[from] dash_mpd::DashMpdError),

    #[error("program date time not set on segments")]
    MissingProgramDateTime,

    #[error("adaptation set has no usable content type")]
    UnknownContentType,

    #[error("encoding filtered playlist: {0}")]
    PlaylistEncode(#[from] std::io::Error),

    #[error("encoding filtered mpd: {0}")]
    MpdEncode(String),

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
}

impl BakeryError {
    /// Status the proxy answers with when this error ends a request.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::FilterParse { .. }
            | Self::RenditionDecode(_)
            | Self::TrimUnsupported(_)
            | Self::UnknownProtocol => StatusCode::BAD_REQUEST,
            Self::PropellerPath(_) | Self::ChannelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::PropellerNotConfigured
            | Self::PropellerStatus(_)
            | Self::ChannelWithoutPlayback
            | Self::Request(_)
            | Self::PlaylistDecode(_)
            | Self::MpdDecode(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamStatus(status) => *status,
            Self::MissingProgramDateTime
            | Self::UnknownContentType
            | Self::PlaylistEncode(_)
            | Self::MpdEncode(_)
            | Self::UrlParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type BakeryResult<T> = Result<T, BakeryError>;
