//! Files to be uploaded and the inputs they are selected from.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Read-only access to a file owned by someone else.
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;
    fn mime_type(&self) -> &str;
    fn size(&self) -> u64;

    /// Reads the bytes in `start..stop`. Both ends are clamped to [`FileHandle::size`], so a
    /// `stop` past the end yields the bytes up to the end of the file.
    fn read_range(&self, start: u64, stop: u64) -> io::Result<Vec<u8>>;
}

/// Resolves a file input id to the files currently selected in it.
pub trait FilePicker: Send + Sync {
    /// Whether files can be read at all. An upload against an unsupported picker does nothing.
    fn is_supported(&self) -> bool {
        true
    }

    fn selected_files(&self, input_id: &str) -> io::Result<Vec<Arc<dyn FileHandle>>>;
}

fn clamp_range(start: u64, stop: u64, size: u64) -> (u64, u64) {
    let stop = stop.min(size);
    (start.min(stop), stop)
}

pub struct MemoryFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        MemoryFile {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }
    fn mime_type(&self) -> &str {
        &self.mime_type
    }
    fn size(&self) -> u64 {
        self.data.len() as u64
    }
    fn read_range(&self, start: u64, stop: u64) -> io::Result<Vec<u8>> {
        let (start, stop) = clamp_range(start, stop, self.size());
        Ok(self.data[start as usize..stop as usize].to_vec())
    }
}

/// A file on disk. The size is taken when the file is opened.
pub struct DiskFile {
    path: PathBuf,
    name: String,
    mime_type: &'static str,
    size: u64,
}

impl DiskFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = path.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|x| x.to_owned())
            .unwrap_or_default();

        Ok(DiskFile {
            path: path.to_owned(),
            mime_type: guess_mime_type(path),
            name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileHandle for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }
    fn mime_type(&self) -> &str {
        self.mime_type
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn read_range(&self, start: u64, stop: u64) -> io::Result<Vec<u8>> {
        let (start, stop) = clamp_range(start, stop, self.size);

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;

        let mut result = Vec::with_capacity((stop - start) as usize);
        file.take(stop - start).read_to_end(&mut result)?;
        Ok(result)
    }
}

/// Maps the extension to a MIME type the way browsers fill `File.type` for common files.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("htm" | "html") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Serves disk files selected under named inputs. Inputs without a selection yield no files.
#[derive(Clone, Debug, Default)]
pub struct PathPicker {
    inputs: HashMap<String, Vec<PathBuf>>,
}

impl PathPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, input_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.inputs
            .entry(input_id.into())
            .or_default()
            .push(path.into());
        self
    }

    pub fn clear(&mut self, input_id: &str) {
        self.inputs.remove(input_id);
    }
}

impl FilePicker for PathPicker {
    fn selected_files(&self, input_id: &str) -> io::Result<Vec<Arc<dyn FileHandle>>> {
        let Some(paths) = self.inputs.get(input_id) else {
            return Ok(vec![]);
        };

        paths
            .iter()
            .map(|path| DiskFile::open(path).map(|f| Arc::new(f) as Arc<dyn FileHandle>))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn memory_range_clamps_to_end() {
        let file = MemoryFile::new("a.bin", "", (0u8..10).collect());
        assert_eq!(file.read_range(0, 4).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(file.read_range(8, 12).unwrap(), vec![8, 9]);
        assert!(file.read_range(12, 16).unwrap().is_empty());
    }

    #[test]
    fn disk_file_attributes_and_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        fs::write(&path, b"hello chunked world").unwrap();

        let file = DiskFile::open(&path).unwrap();
        assert_eq!(file.name(), "notes.TXT");
        assert_eq!(file.mime_type(), "text/plain");
        assert_eq!(file.size(), 19);
        assert_eq!(file.read_range(6, 13).unwrap(), b"chunked");
        assert_eq!(file.read_range(14, 100).unwrap(), b"world");
    }

    #[test]
    fn disk_file_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DiskFile::open(dir.path()).is_err());
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(guess_mime_type(Path::new("archive.xyz")), FALLBACK_MIME_TYPE);
        assert_eq!(guess_mime_type(Path::new("Makefile")), FALLBACK_MIME_TYPE);
        assert_eq!(guess_mime_type(Path::new("photo.JPEG")), "image/jpeg");
    }

    #[test]
    fn picker_resolves_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, b"{}").unwrap();

        let mut picker = PathPicker::new().select("file", &path);
        let files = picker.selected_files("file").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].mime_type(), "application/json");
        assert!(picker.selected_files("other").unwrap().is_empty());

        picker.clear("file");
        assert!(picker.selected_files("file").unwrap().is_empty());
    }
}
