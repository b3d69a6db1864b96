//! Ordered class labels and the persisted formats they are read from.
//!
//! Labels are stored either as a NumPy `.npy` array of fixed-width strings, as
//! written by `numpy.save(encoder.classes_)`, or as a JSON array of strings.

use std::collections::HashMap;

use thiserror::Error;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Reasons a label file cannot be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelsError {
    #[error("label list is empty")]
    Empty,
    #[error("label {label:?} appears more than once")]
    Duplicate { label: String },
    #[error("invalid JSON label list: {0}")]
    Json(String),
    #[error("invalid .npy header: {0}")]
    NpyHeader(String),
    #[error("unsupported .npy dtype {0:?}; save labels as fixed-width unicode")]
    NpyDtype(String),
    #[error(".npy payload holds {actual} bytes but {expected} were declared")]
    NpyPayloadLength { expected: usize, actual: usize },
    #[error(".npy element {index} is not valid text")]
    NpyText { index: usize },
}

/// Bidirectional mapping between class index and class name.
///
/// Index position in the stored list is the numeric class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Builds an encoder from an ordered class list.
    ///
    /// # Errors
    ///
    /// Returns [`LabelsError::Empty`] for an empty list and
    /// [`LabelsError::Duplicate`] when a label repeats.
    pub fn new(classes: Vec<String>) -> Result<Self, LabelsError> {
        if classes.is_empty() {
            return Err(LabelsError::Empty);
        }
        let mut index = HashMap::with_capacity(classes.len());
        for (position, label) in classes.iter().enumerate() {
            if index.insert(label.clone(), position).is_some() {
                return Err(LabelsError::Duplicate {
                    label: label.clone(),
                });
            }
        }
        Ok(Self { classes, index })
    }

    /// Decodes label file contents, choosing the format from the file name.
    ///
    /// # Errors
    ///
    /// Returns a [`LabelsError`] describing why the content is unusable.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, LabelsError> {
        let classes = if file_name.ends_with(".npy") {
            parse_npy(bytes)?
        } else {
            serde_json::from_slice::<Vec<String>>(bytes)
                .map_err(|e| LabelsError::Json(e.to_string()))?
        };
        Self::new(classes)
    }

    /// Returns the label for a class index.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Returns the class index for a label.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always `false`; construction rejects empty lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NpyText {
    /// UTF-32 code units, `width` characters per element.
    Unicode { width: usize, big_endian: bool },
    /// Raw bytes, `width` bytes per element.
    Bytes { width: usize },
}

fn parse_npy(bytes: &[u8]) -> Result<Vec<String>, LabelsError> {
    let rest = bytes
        .strip_prefix(NPY_MAGIC)
        .ok_or_else(|| LabelsError::NpyHeader("missing magic string".into()))?;
    let (&major, rest) = rest
        .split_first()
        .ok_or_else(|| LabelsError::NpyHeader("missing version".into()))?;
    let rest = rest
        .get(1..)
        .ok_or_else(|| LabelsError::NpyHeader("missing version".into()))?;
    let (header_len, rest) = match major {
        1 => {
            let (len, rest) = split_array::<2>(rest)?;
            (usize::from(u16::from_le_bytes(len)), rest)
        }
        2 | 3 => {
            let (len, rest) = split_array::<4>(rest)?;
            let len = usize::try_from(u32::from_le_bytes(len))
                .map_err(|_| LabelsError::NpyHeader("header length overflows".into()))?;
            (len, rest)
        }
        other => return Err(LabelsError::NpyHeader(format!("unknown version {other}"))),
    };
    let header = rest
        .get(..header_len)
        .ok_or_else(|| LabelsError::NpyHeader("header shorter than declared".into()))?;
    let header = std::str::from_utf8(header)
        .map_err(|_| LabelsError::NpyHeader("header is not text".into()))?;
    let payload = rest.get(header_len..).unwrap_or_default();

    let descr = header_string(header, "descr")?;
    let text = parse_descr(descr)?;
    let count = parse_shape(header)?;

    let overflow = || LabelsError::NpyHeader("declared size overflows".into());
    let element_size = match text {
        NpyText::Unicode { width, .. } => width.checked_mul(4).ok_or_else(overflow)?,
        NpyText::Bytes { width } => width,
    };
    let expected = element_size.checked_mul(count).ok_or_else(overflow)?;
    if element_size == 0 {
        return Err(LabelsError::NpyDtype(descr.to_owned()));
    }
    if payload.len() != expected {
        return Err(LabelsError::NpyPayloadLength {
            expected,
            actual: payload.len(),
        });
    }

    payload
        .chunks_exact(element_size)
        .enumerate()
        .map(|(index, element)| decode_element(text, element).ok_or(LabelsError::NpyText { index }))
        .collect()
}

fn split_array<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8]), LabelsError> {
    let head = bytes
        .get(..N)
        .and_then(|head| <[u8; N]>::try_from(head).ok())
        .ok_or_else(|| LabelsError::NpyHeader("missing header length".into()))?;
    Ok((head, bytes.get(N..).unwrap_or_default()))
}

/// Extracts the quoted value stored under `key` in the header dictionary.
fn header_string<'h>(header: &'h str, key: &str) -> Result<&'h str, LabelsError> {
    let after_key = header_value(header, key)?;
    let quote = after_key
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| LabelsError::NpyHeader(format!("{key} is not a string")))?;
    let body = &after_key[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| LabelsError::NpyHeader(format!("unterminated {key}")))?;
    Ok(&body[..end])
}

fn header_value<'h>(header: &'h str, key: &str) -> Result<&'h str, LabelsError> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let start = quoted
        .iter()
        .find_map(|needle| header.find(needle.as_str()).map(|at| at + needle.len()))
        .ok_or_else(|| LabelsError::NpyHeader(format!("missing {key}")))?;
    let after = header[start..].trim_start();
    let after = after
        .strip_prefix(':')
        .ok_or_else(|| LabelsError::NpyHeader(format!("malformed {key}")))?;
    Ok(after.trim_start())
}

fn parse_descr(descr: &str) -> Result<NpyText, LabelsError> {
    let unsupported = || LabelsError::NpyDtype(descr.to_owned());
    let mut chars = descr.chars();
    let order = chars.next().ok_or_else(unsupported)?;
    let code = chars.next().ok_or_else(unsupported)?;
    let width: usize = chars.as_str().parse().map_err(|_| unsupported())?;
    match (order, code) {
        ('<' | '|' | '=', 'U') => Ok(NpyText::Unicode {
            width,
            big_endian: false,
        }),
        ('>', 'U') => Ok(NpyText::Unicode {
            width,
            big_endian: true,
        }),
        ('|' | '<' | '>' | '=', 'S') => Ok(NpyText::Bytes { width }),
        _ => Err(unsupported()),
    }
}

fn parse_shape(header: &str) -> Result<usize, LabelsError> {
    let value = header_value(header, "shape")?;
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| LabelsError::NpyHeader("malformed shape".into()))?;
    let dims = inner
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::parse::<usize>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| LabelsError::NpyHeader("malformed shape".into()))?;
    match dims.as_slice() {
        [count] => Ok(*count),
        _ => Err(LabelsError::NpyHeader(format!(
            "expected a 1-D array but found {} dimensions",
            dims.len()
        ))),
    }
}

fn decode_element(text: NpyText, element: &[u8]) -> Option<String> {
    match text {
        NpyText::Unicode { big_endian, .. } => {
            let mut decoded = String::new();
            for unit in element.chunks_exact(4) {
                let raw = <[u8; 4]>::try_from(unit).ok()?;
                let code = if big_endian {
                    u32::from_be_bytes(raw)
                } else {
                    u32::from_le_bytes(raw)
                };
                if code == 0 {
                    break;
                }
                decoded.push(char::from_u32(code)?);
            }
            Some(decoded)
        }
        NpyText::Bytes { .. } => {
            let end = element.iter().position(|b| *b == 0).unwrap_or(element.len());
            String::from_utf8(element[..end].to_vec()).ok()
        }
    }
}
