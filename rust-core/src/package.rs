use crate::Workbook;
use crate::template::{CONTENT_TYPES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};
use ::zip as zip_crate;
use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// One file inside the xlsx zip archive.
pub(crate) struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

impl Part {
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            data,
        }
    }
}

/// Work with files
impl Workbook {
    /// Opens the workbook at `src` and reads all of its parts into memory.
    pub fn open<P: AsRef<Path>>(src: P) -> Result<Self> {
        let src = src.as_ref();
        let file = File::open(src).with_context(|| format!("cannot open {}", src.display()))?;
        Self::from_reader(file).with_context(|| format!("{} is not a valid xlsx workbook", src.display()))
    }

    /// Reads a workbook from any seekable byte source.
    ///
    /// Fails when the bytes are not a zip archive or the archive lacks the
    /// parts every workbook has.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut zip = zip_crate::ZipArchive::new(reader).context("not a zip archive")?;

        let mut parts = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_owned();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .with_context(|| format!("cannot read {name}"))?;
            parts.push(Part { name, data });
        }

        let book = Self {
            parts,
            sheet_path: None,
            sheet_xml: Vec::new(),
            last_row: 0,
        };
        for required in [CONTENT_TYPES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART] {
            book.part(required)?;
        }
        // workbook.xml должен разбираться
        book.sheet_names()?;
        Ok(book)
    }

    /// Writes the workbook to `dst`, replacing any existing file.
    ///
    /// The archive is built in a temporary file in the destination directory
    /// and renamed over `dst` only once it is complete.
    pub fn save<P: AsRef<Path>>(&mut self, dst: P) -> Result<()> {
        self.flush_current_sheet();

        let dst = dst.as_ref();
        let dir = match dst.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot create a temporary file in {}", dir.display()))?;

        {
            let mut zout = zip_crate::ZipWriter::new(tmp.as_file_mut());
            let opt: zip_crate::write::FileOptions<'_, ()> =
                zip_crate::write::FileOptions::default()
                    .compression_method(zip_crate::CompressionMethod::Deflated)
                    .compression_level(Some(1));

            for part in &self.parts {
                zout.start_file(part.name.as_str(), opt)?;
                zout.write_all(&part.data)?;
            }
            zout.finish()?;
        }

        tmp.persist(dst)
            .with_context(|| format!("cannot write {}", dst.display()))?;
        Ok(())
    }
}
