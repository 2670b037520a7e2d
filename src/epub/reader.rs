use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::book::{Book, ManifestItem};
use crate::epub::parser::{OpfData, parse_container_xml, parse_nav, parse_ncx, parse_opf, strip_bom};
use crate::error::{Error, Result};

/// Read an EPUB file from disk into a [`Book`].
///
/// Supports EPUB 2 and EPUB 3. The table of contents comes from the NCX when
/// the package has one, otherwise from the EPUB 3 navigation document.
///
/// # Example
///
/// ```no_run
/// use bookslice::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("Title: {}", book.metadata.title);
/// # Ok::<(), bookslice::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// # Example
///
/// ```no_run
/// use std::io::Cursor;
/// use bookslice::epub::read_epub_from_reader;
///
/// let epub_data: Vec<u8> = std::fs::read("book.epub")?;
/// let book = read_epub_from_reader(Cursor::new(epub_data))?;
/// # Ok::<(), bookslice::Error>(())
/// ```
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    // 1. Find the OPF file path from container.xml
    let container = read_archive_file_bytes(&mut archive, "META-INF/container.xml")?;
    let opf_path = parse_container_xml(&container)?;
    let opf_dir = Path::new(&opf_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    // 2. Parse the OPF file
    let opf_content = read_archive_file(&mut archive, &opf_path)?;
    let OpfData {
        metadata,
        manifest,
        spine,
        ncx_href,
        nav_href,
    } = parse_opf(&opf_content)?;

    if manifest.is_empty() {
        return Err(Error::MissingElement(format!("manifest items in {opf_path}")));
    }

    let mut book = Book::new();
    book.metadata = metadata;

    // 3. Load every manifest resource, keeping package order. Keys are
    //    decoded paths since TOC hrefs are decoded before matching.
    for item in &manifest {
        let full_path = resolve_path(&opf_dir, &decode_href(&item.href));
        let raw_path = resolve_path(&opf_dir, &item.href);
        match read_archive_file_bytes(&mut archive, &raw_path) {
            Ok(data) => book.add_resource(full_path.clone(), data, item.media_type.clone()),
            Err(e) => log::warn!("skipping manifest item {}: {e}", item.id),
        }
        book.manifest.push(ManifestItem {
            id: item.id.clone(),
            path: full_path,
            media_type: item.media_type.clone(),
        });
    }

    // 4. Build spine from idrefs
    for (idref, linear) in spine {
        match manifest.iter().find(|item| item.id == idref) {
            Some(item) => {
                book.add_spine_item(
                    &idref,
                    resolve_path(&opf_dir, &decode_href(&item.href)),
                    item.media_type.clone(),
                );
                if let Some(last) = book.spine.last_mut() {
                    last.linear = linear;
                }
            }
            None => log::warn!("spine references unknown manifest id {idref}"),
        }
    }

    // 5. Table of contents: NCX first, EPUB 3 nav as fallback
    if let Some(ncx_href) = ncx_href {
        let ncx_path = resolve_path(&opf_dir, &ncx_href);
        match read_archive_file(&mut archive, &ncx_path) {
            Ok(ncx_content) => book.toc = parse_ncx(&ncx_content)?,
            Err(e) => log::warn!("cannot read NCX {ncx_path}: {e}"),
        }
    }
    if book.toc.is_empty()
        && let Some(nav_href) = nav_href
    {
        let nav_path = resolve_path(&opf_dir, &nav_href);
        match read_archive_file(&mut archive, &nav_path) {
            Ok(nav_content) => book.toc = parse_nav(&nav_content)?,
            Err(e) => log::warn!("cannot read navigation document {nav_path}: {e}"),
        }
    }

    log::debug!(
        "read {:?}: {} manifest items, {} spine items, {} top-level TOC entries",
        book.metadata.title,
        book.manifest.len(),
        book.spine.len(),
        book.toc.len()
    );

    Ok(book)
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let bytes = read_archive_file_bytes(archive, path)?;
    Ok(String::from_utf8(strip_bom(&bytes).to_vec())?)
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    // Try direct lookup first
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(zip::result::ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: try percent-decoded path (handles malformed EPUBs)
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {}", path)))?;

    let mut file = archive.by_name(&decoded)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Percent-decode an href (`Text/%E7%AB%A0.xhtml` -> `Text/章.xhtml`).
fn decode_href(href: &str) -> String {
    percent_encoding::percent_decode_str(href)
        .decode_utf8_lossy()
        .into_owned()
}

fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base, href)
    }
}
