//! Multipart payload encoding.
//!
//! Flattens an [`UploadInput`] into an ordered list of named
//! [`MultipartPart`]s. Each top-level entry is classified once and encoded by
//! its shape:
//!
//! - `transformations` map: one `transformations[sub]` part per spec; a spec
//!   map carrying a `key` field is sent as that key.
//! - scalar: one part named after the key.
//! - collection whose first element is a file: one `key[]` file part per file.
//! - any other collection: one `key[sub]` part per entry.
//! - single file: one `key[]` file part.
//!
//! Nesting is flattened exactly one level. Values below that are sent as a
//! JSON string, not flattened further; servers rely on that shape.
//!
//! Part order follows input order. Encoding is all-or-nothing: on error every
//! handle opened so far is dropped and no parts are returned.

mod error;
mod file;
mod value;

pub use error::EncodeError;
pub use file::UploadFile;
pub use value::{Scalar, UploadInput, UploadValue};

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::PathBuf;

/// Reserved top-level key for transformation specs.
pub const TRANSFORMATIONS_KEY: &str = "transformations";
/// Parent name of metadata fields.
pub const METADATA_KEY: &str = "metadata";

/// Content of one part.
pub enum PartContent {
    Text(String),
    /// Open handle on `path`; whoever sends the request closes it. The
    /// transport may stream from `path` instead of reading the handle.
    File {
        handle: File,
        path: PathBuf,
        filename: String,
    },
}

impl fmt::Debug for PartContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartContent::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PartContent::File { path, filename, .. } => f
                .debug_struct("File")
                .field("path", path)
                .field("filename", filename)
                .finish(),
        }
    }
}

/// One named field or file of a multipart body.
#[derive(Debug)]
pub struct MultipartPart {
    pub name: String,
    pub content: PartContent,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match &self.content {
            PartContent::File { filename, .. } => Some(filename),
            PartContent::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            PartContent::Text(s) => Some(s),
            PartContent::File { .. } => None,
        }
    }
}

/// Shape of a top-level entry.
enum Shape<'a> {
    Transformations(Vec<(String, &'a UploadValue)>),
    Files(Vec<&'a UploadFile>),
    Collection(Vec<(String, &'a UploadValue)>),
    File(&'a UploadFile),
    Scalar(&'a Scalar),
}

fn classify<'a>(key: &str, value: &'a UploadValue) -> Result<Shape<'a>, EncodeError> {
    let entries = match value {
        UploadValue::File(f) => return Ok(Shape::File(f)),
        UploadValue::Scalar(s) => return Ok(Shape::Scalar(s)),
        UploadValue::List(_) | UploadValue::Map(_) => value.entries().unwrap_or_default(),
    };
    if key == TRANSFORMATIONS_KEY {
        return Ok(Shape::Transformations(entries));
    }

    // The first element decides; anything disagreeing with it is rejected.
    let first_is_file = matches!(entries.first(), Some((_, UploadValue::File(_))));
    let mut files = Vec::new();
    for v in entries.iter().map(|(_, v)| *v) {
        match (first_is_file, v) {
            (true, UploadValue::File(f)) => files.push(f),
            (false, UploadValue::File(_)) | (true, _) => {
                return Err(EncodeError::MixedCollection {
                    key: key.to_string(),
                })
            }
            (false, _) => {}
        }
    }
    Ok(if first_is_file {
        Shape::Files(files)
    } else {
        Shape::Collection(entries)
    })
}

/// Encodes an upload input into ordered multipart parts.
pub fn encode(input: &UploadInput) -> Result<Vec<MultipartPart>, EncodeError> {
    let mut parts = Vec::with_capacity(input.len());
    for (key, value) in input.iter() {
        match classify(key, value)? {
            Shape::Transformations(specs) => {
                for (sub, spec) in specs {
                    parts.push(transformation_part(&sub, spec)?);
                }
            }
            Shape::Files(files) => {
                for f in files {
                    parts.push(file_part(key, f)?);
                }
            }
            Shape::Collection(entries) => {
                for (sub, v) in entries {
                    parts.push(nested_field(key, &sub, v)?);
                }
            }
            Shape::File(f) => parts.push(file_part(key, f)?),
            Shape::Scalar(s) => parts.push(MultipartPart::text(key, s.to_field_string())),
        }
    }
    ensure_unique_fields(&parts)?;
    tracing::debug!("encoded {} entries into {} parts", input.len(), parts.len());
    Ok(parts)
}

/// Text field names must not repeat; a bracketed top-level key such as
/// `tags[0]` can otherwise collide with a flattened `tags` entry. Repeated
/// `key[]` file parts are expected and not checked.
fn ensure_unique_fields(parts: &[MultipartPart]) -> Result<(), EncodeError> {
    let mut seen = HashSet::new();
    for part in parts {
        if let PartContent::Text(_) = part.content {
            if !seen.insert(part.name.as_str()) {
                return Err(EncodeError::DuplicateName {
                    name: part.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Encodes a metadata update: each entry of a nested collection becomes
/// `metadata[sub]` regardless of its parent key, top-level scalars become
/// plain fields and top-level files become file parts.
pub fn encode_metadata(input: &UploadInput) -> Result<Vec<MultipartPart>, EncodeError> {
    let mut parts = Vec::with_capacity(input.len());
    for (key, value) in input.iter() {
        match value {
            UploadValue::List(_) | UploadValue::Map(_) => {
                for (sub, v) in value.entries().unwrap_or_default() {
                    parts.push(encode_metadata_field(&sub, v)?);
                }
            }
            UploadValue::File(f) => parts.push(file_part(key, f)?),
            UploadValue::Scalar(s) => parts.push(MultipartPart::text(key, s.to_field_string())),
        }
    }
    Ok(parts)
}

/// Encodes one metadata entry as `metadata[key]`; collection values are sent
/// as JSON.
pub fn encode_metadata_field(key: &str, value: &UploadValue) -> Result<MultipartPart, EncodeError> {
    nested_field(METADATA_KEY, key, value)
}

/// `parent[sub]` text part.
fn nested_field(parent: &str, sub: &str, value: &UploadValue) -> Result<MultipartPart, EncodeError> {
    let name = format!("{}[{}]", parent, sub);
    let content = field_content(&name, value)?;
    Ok(MultipartPart::text(name, content))
}

fn transformation_part(sub: &str, spec: &UploadValue) -> Result<MultipartPart, EncodeError> {
    let name = format!("{}[{}]", TRANSFORMATIONS_KEY, sub);
    let content = match spec.get("key") {
        Some(UploadValue::Scalar(Scalar::Null)) | None => field_content(&name, spec)?,
        Some(k) => field_content(&name, k)?,
    };
    Ok(MultipartPart::text(name, content))
}

fn field_content(name: &str, value: &UploadValue) -> Result<String, EncodeError> {
    match value {
        UploadValue::Scalar(s) => Ok(s.to_field_string()),
        UploadValue::List(_) | UploadValue::Map(_) => Ok(value.to_json(name)?.to_string()),
        UploadValue::File(_) => Err(EncodeError::NestedFile {
            name: name.to_string(),
        }),
    }
}

fn file_part(key: &str, file: &UploadFile) -> Result<MultipartPart, EncodeError> {
    let name = if key.ends_with("[]") {
        key.to_string()
    } else {
        format!("{}[]", key)
    };
    let handle = file.open()?;
    Ok(MultipartPart {
        name,
        content: PartContent::File {
            handle,
            path: file.path().to_path_buf(),
            filename: file.original_name().to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn names(parts: &[MultipartPart]) -> Vec<&str> {
        parts.iter().map(|p| p.name.as_str()).collect()
    }

    fn texts(parts: &[MultipartPart]) -> Vec<&str> {
        parts.iter().filter_map(|p| p.text_content()).collect()
    }

    fn temp_file(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> UploadFile {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(body).unwrap();
        UploadFile::new(path, format!("client-{}", name))
    }

    #[test]
    fn scalars_then_flat_list_in_order() {
        let input = UploadInput::new()
            .with("title", "x")
            .with("tags", UploadValue::list(["a", "b"]));
        let parts = encode(&input).unwrap();
        assert_eq!(names(&parts), ["title", "tags[0]", "tags[1]"]);
        assert_eq!(texts(&parts), ["x", "a", "b"]);
    }

    #[test]
    fn transformation_unwraps_key_field() {
        let input = UploadInput::new().with(
            "transformations",
            UploadValue::map([("resize", UploadValue::map([("key", "thumb_200")]))]),
        );
        let parts = encode(&input).unwrap();
        assert_eq!(names(&parts), ["transformations[resize]"]);
        assert_eq!(texts(&parts), ["thumb_200"]);
    }

    #[test]
    fn transformation_without_key_is_verbatim() {
        let input = UploadInput::new().with(
            "transformations",
            UploadValue::map([
                ("normalize", UploadValue::from("loudness")),
                ("trim", UploadValue::map([("start", 1), ("end", 5)])),
            ]),
        );
        let parts = encode(&input).unwrap();
        assert_eq!(
            names(&parts),
            ["transformations[normalize]", "transformations[trim]"]
        );
        assert_eq!(texts(&parts), ["loudness", r#"{"start":1,"end":5}"#]);
    }

    #[test]
    fn nested_map_flattens_one_level_then_json() {
        let input = UploadInput::new().with(
            "metadata",
            UploadValue::map([
                ("artist", UploadValue::from("Nina")),
                ("credits", UploadValue::map([("mix", UploadValue::list(["a", "b"]))])),
            ]),
        );
        let parts = encode(&input).unwrap();
        assert_eq!(names(&parts), ["metadata[artist]", "metadata[credits]"]);
        assert_eq!(texts(&parts), ["Nina", r#"{"mix":["a","b"]}"#]);
    }

    #[test]
    fn empty_collection_emits_nothing() {
        let input = UploadInput::new()
            .with("tags", UploadValue::List(Vec::new()))
            .with("title", "t");
        assert_eq!(names(&encode(&input).unwrap()), ["title"]);
    }

    #[test]
    fn file_list_parts_keep_bracket_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let a = temp_file(&dir, "a.mp3", b"AAA");
        let b = temp_file(&dir, "b.mp3", b"BB");
        let input = UploadInput::new()
            .with("files", UploadValue::list([a, b.clone()]))
            .with("extra[]", b)
            .with("cover", temp_file(&dir, "c.png", b"C"));
        let mut parts = encode(&input).unwrap();
        assert_eq!(names(&parts), ["files[]", "files[]", "extra[]", "cover[]"]);
        assert_eq!(parts[0].filename(), Some("client-a.mp3"));
        assert_eq!(parts[3].filename(), Some("client-c.png"));
        match &mut parts[0].content {
            PartContent::File { handle, .. } => {
                let mut body = Vec::new();
                handle.read_to_end(&mut body).unwrap();
                assert_eq!(body, b"AAA");
            }
            PartContent::Text(_) => panic!("expected file part"),
        }
    }

    #[test]
    fn missing_file_fails_without_parts() {
        let dir = tempfile::tempdir().unwrap();
        let present = temp_file(&dir, "ok.wav", b"x");
        let missing = UploadFile::new(dir.path().join("missing.wav"), "missing.wav");
        let input = UploadInput::new()
            .with("title", "t")
            .with("files", UploadValue::list([present, missing]));
        let err = encode(&input).unwrap_err();
        assert!(matches!(err, EncodeError::FileNotFound { path } if path.ends_with("missing.wav")));
    }

    #[test]
    fn mixed_collection_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let f = temp_file(&dir, "a.mp3", b"A");
        let files_first = UploadInput::new().with(
            "files",
            UploadValue::list([UploadValue::File(f.clone()), UploadValue::from("x")]),
        );
        assert!(matches!(
            encode(&files_first),
            Err(EncodeError::MixedCollection { key }) if key == "files"
        ));
        let scalar_first = UploadInput::new().with(
            "files",
            UploadValue::list([UploadValue::from("x"), UploadValue::File(f)]),
        );
        assert!(matches!(
            encode(&scalar_first),
            Err(EncodeError::MixedCollection { .. })
        ));
    }

    #[test]
    fn file_inside_transformation_rejected() {
        let input = UploadInput::new().with(
            "transformations",
            UploadValue::map([("x", UploadFile::new("/tmp/x", "x"))]),
        );
        assert!(matches!(
            encode(&input),
            Err(EncodeError::NestedFile { name }) if name == "transformations[x]"
        ));
    }

    #[test]
    fn metadata_field_serializes_collections() {
        let p = encode_metadata_field("genres", &UploadValue::list(["rock", "pop"])).unwrap();
        assert_eq!(p.name, "metadata[genres]");
        assert_eq!(p.text_content(), Some(r#"["rock","pop"]"#));
        let p = encode_metadata_field("year", &UploadValue::from(1999)).unwrap();
        assert_eq!(p.text_content(), Some("1999"));
    }

    #[test]
    fn metadata_traversal_hoists_nested_entries() {
        let input = UploadInput::new()
            .with("status", "published")
            .with("fields", UploadValue::map([("album", "Blue"), ("track", "3")]));
        let parts = encode_metadata(&input).unwrap();
        assert_eq!(names(&parts), ["status", "metadata[album]", "metadata[track]"]);
        assert_eq!(texts(&parts), ["published", "Blue", "3"]);
    }

    #[test]
    fn flat_names_are_unique_and_recover_paths() {
        let input = UploadInput::new()
            .with("a", "1")
            .with("b", UploadValue::list(["x", "y"]))
            .with("c", UploadValue::map([("k", "v"), ("0", "w")]));
        let parts = encode(&input).unwrap();
        let mut seen = std::collections::HashSet::new();
        for p in &parts {
            assert!(seen.insert(p.name.clone()), "duplicate name {}", p.name);
        }
        let paths: Vec<Vec<&str>> = parts
            .iter()
            .map(|p| match p.name.split_once('[') {
                Some((head, rest)) => vec![head, rest.trim_end_matches(']')],
                None => vec![p.name.as_str()],
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                vec!["a"],
                vec!["b", "0"],
                vec!["b", "1"],
                vec!["c", "k"],
                vec!["c", "0"]
            ]
        );
    }

    #[test]
    fn bracketed_key_colliding_with_flattened_entry_rejected() {
        let input = UploadInput::new()
            .with("tags", UploadValue::list(["a"]))
            .with("tags[0]", "b");
        assert!(matches!(
            encode(&input),
            Err(EncodeError::DuplicateName { name }) if name == "tags[0]"
        ));
    }

    #[test]
    fn repeated_file_parts_are_not_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let input = UploadInput::new()
            .with(
                "files",
                UploadValue::list([temp_file(&dir, "a.mp3", b"A"), temp_file(&dir, "b.mp3", b"B")]),
            )
            .with("files[]", temp_file(&dir, "c.mp3", b"C"));
        assert_eq!(names(&encode(&input).unwrap()), ["files[]", "files[]", "files[]"]);
    }

    #[test]
    fn transformation_with_null_key_sends_spec() {
        let input = UploadInput::new().with(
            "transformations",
            UploadValue::map([(
                "resize",
                UploadValue::map([("key", UploadValue::from(Scalar::Null)), ("w", UploadValue::from(200i64))]),
            )]),
        );
        let parts = encode(&input).unwrap();
        assert_eq!(texts(&parts), [r#"{"key":null,"w":200}"#]);
    }
}
