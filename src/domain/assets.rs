//! Mapping from delivered image URLs to the remote store's public identifiers.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_DELIVERY_HOST: &str = "res.cloudinary.com";

const UPLOAD_DELIVERY_TYPE: &str = "upload";

/// Parameter keys the delivery service accepts in a transformation segment.
const TRANSFORMATION_KEYS: &[&str] = &[
    "a", "ac", "af", "ar", "b", "bo", "br", "c", "co", "cs", "d", "dl", "dn", "dpr", "du", "e",
    "eo", "f", "fl", "fn", "fps", "g", "h", "ki", "l", "o", "p", "pg", "q", "r", "so", "sp", "t",
    "u", "vc", "vs", "w", "x", "y", "z",
];

/// Identifier the asset store uses to address an uploaded image for deletion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PublicId(String);

impl PublicId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetUrlError {
    #[error("not an absolute http(s) url: {0}")]
    Malformed(String),
    #[error("url host `{host}` is not the asset delivery host")]
    ForeignHost { host: String },
    #[error("url belongs to cloud `{found}`, expected `{expected}`")]
    ForeignCloud { found: String, expected: String },
    #[error("url path does not address an uploaded asset")]
    NotAnUpload,
    #[error("url does not contain a public identifier")]
    EmptyPublicId,
}

/// Resolves delivery URLs of the form
/// `https://<host>/<cloud>/<resource>/upload/[<transformations>/][v<version>/]<public id>.<ext>`.
#[derive(Debug, Clone)]
pub struct AssetUrlResolver {
    delivery_host: String,
    cloud_name: Option<String>,
}

impl Default for AssetUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_HOST, None)
    }
}

impl AssetUrlResolver {
    pub fn new(delivery_host: impl Into<String>, cloud_name: Option<String>) -> Self {
        Self {
            delivery_host: delivery_host.into(),
            cloud_name,
        }
    }

    pub fn public_id(&self, src: &str) -> Result<PublicId, AssetUrlError> {
        let url = Url::parse(src).map_err(|_| AssetUrlError::Malformed(src.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AssetUrlError::Malformed(src.to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| AssetUrlError::Malformed(src.to_string()))?;
        if !host.eq_ignore_ascii_case(&self.delivery_host) {
            return Err(AssetUrlError::ForeignHost {
                host: host.to_string(),
            });
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        let [cloud, _resource_type, delivery_type, rest @ ..] = segments.as_slice() else {
            return Err(AssetUrlError::NotAnUpload);
        };

        if let Some(expected) = self.cloud_name.as_deref()
            && *cloud != expected
        {
            return Err(AssetUrlError::ForeignCloud {
                found: (*cloud).to_string(),
                expected: expected.to_string(),
            });
        }

        if *delivery_type != UPLOAD_DELIVERY_TYPE {
            return Err(AssetUrlError::NotAnUpload);
        }

        let id_segments = match rest.iter().position(|segment| is_version(segment)) {
            Some(version_index) => &rest[version_index + 1..],
            None => {
                let skip = rest
                    .iter()
                    .take_while(|segment| is_transformation(segment))
                    .count();
                &rest[skip..]
            }
        };

        let Some((last, folders)) = id_segments.split_last() else {
            return Err(AssetUrlError::EmptyPublicId);
        };

        let last = decode_segment(last, src)?;
        let stem = match last.rfind('.') {
            Some(dot) if dot > 0 => &last[..dot],
            _ => last.as_str(),
        };

        let mut public_id = String::new();
        for folder in folders {
            public_id.push_str(&decode_segment(folder, src)?);
            public_id.push('/');
        }
        public_id.push_str(stem);

        Ok(PublicId(public_id))
    }
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Transformation segments look like `c_fill,w_200,h_200`. Every parameter
/// must use a known key, so folders such as `my_boards` are kept.
fn is_transformation(segment: &str) -> bool {
    segment.split(',').all(|part| {
        part.split_once('_').is_some_and(|(key, value)| {
            TRANSFORMATION_KEYS.contains(&key) && !value.is_empty()
        })
    })
}

fn decode_segment(segment: &str, src: &str) -> Result<String, AssetUrlError> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AssetUrlError::Malformed(src.to_string()))
}
