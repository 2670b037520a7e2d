use std::io::{Cursor, Write};

use bookslice::{
    Book, Chapter, ChapterSlicer, MemoryStore, TocNode, extract_bookmarks, read_epub,
    read_epub_from_reader, save_chapters, split_book,
};
use proptest::prelude::*;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sliced</dc:title>
    <dc:creator>A. Writer</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="id">urn:test:sliced</dc:identifier>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="ch1" href="Text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="Text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch3" href="Text/ch3.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="ch3"/>
  </spine>
</package>"#;

const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="p1" playOrder="1">
      <navLabel><text>Part One</text></navLabel>
      <content src="Text/ch1.xhtml"/>
      <navPoint id="c1" playOrder="2">
        <navLabel><text>Opening</text></navLabel>
        <content src="Text/ch1.xhtml#open"/>
      </navPoint>
      <navPoint id="c2" playOrder="3">
        <navLabel><text>Journey</text></navLabel>
        <content src="Text/ch1.xhtml#journey"/>
      </navPoint>
    </navPoint>
    <navPoint id="c3" playOrder="4">
      <navLabel><text>Arrival</text></navLabel>
      <content src="Text/ch3.xhtml#arrival"/>
    </navPoint>
  </navMap>
</ncx>"#;

fn page(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>page</title></head>
<body>
{body}
</body>
</html>"#
    )
}

fn build_epub(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("mimetype", options).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", options).unwrap();
    zip.write_all(CONTAINER.as_bytes()).unwrap();
    for (path, data) in files {
        zip.start_file(*path, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// A package whose manifest lists `(id, href)` content documents in order.
fn flat_opf(items: &[(&str, &str)]) -> String {
    let manifest: String = items
        .iter()
        .map(|(id, href)| {
            format!(r#"<item id="{id}" href="{href}" media-type="application/xhtml+xml"/>"#)
        })
        .collect();
    let spine: String = items
        .iter()
        .map(|(id, _)| format!(r#"<itemref idref="{id}"/>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Flat</dc:title>
    <dc:identifier id="id">urn:test:flat</dc:identifier>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    {manifest}
  </manifest>
  <spine toc="ncx">{spine}</spine>
</package>"#
    )
}

/// An NCX with one top-level navPoint per `(label, src)`.
fn flat_ncx(points: &[(&str, &str)]) -> String {
    let nav_points: String = points
        .iter()
        .enumerate()
        .map(|(i, (label, src))| {
            format!(
                r#"<navPoint id="n{i}" playOrder="{order}">
  <navLabel><text>{label}</text></navLabel>
  <content src="{src}"/>
</navPoint>"#,
                order = i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>{nav_points}</navMap>
</ncx>"#
    )
}

fn ncx_epub() -> Vec<u8> {
    build_epub(&[
        ("OEBPS/content.opf", OPF.into()),
        ("OEBPS/toc.ncx", NCX.into()),
        ("OEBPS/style.css", b"p { margin: 0 }".to_vec()),
        (
            "OEBPS/Text/ch1.xhtml",
            page(
                r#"<p>Front matter</p>
<h1 id="open">Opening</h1>
<p>It began at dawn.</p>
<h1 id="journey">Journey</h1>
<p>They walked for days.</p>"#,
            )
            .into(),
        ),
        (
            "OEBPS/Text/ch2.xhtml",
            page("<p>Still walking.</p>").into(),
        ),
        (
            "OEBPS/Text/ch3.xhtml",
            page(
                r#"<p>The road ended.</p>
<h1 id="arrival">Arrival</h1>
<p>Home at last.</p>"#,
            )
            .into(),
        ),
    ])
}

fn read(data: Vec<u8>) -> Book {
    read_epub_from_reader(Cursor::new(data)).expect("Failed to read EPUB")
}

#[test]
fn test_read_package() {
    let book = read(ncx_epub());

    assert_eq!(book.metadata.title, "Sliced");
    assert_eq!(book.metadata.authors, vec!["A. Writer"]);
    assert_eq!(book.spine.len(), 3);
    assert_eq!(book.toc.len(), 2);
    assert_eq!(book.toc[0].children.len(), 2);

    let documents: Vec<_> = book.content_documents().map(|(name, _)| name).collect();
    assert_eq!(
        documents,
        vec!["OEBPS/Text/ch1.xhtml", "OEBPS/Text/ch2.xhtml", "OEBPS/Text/ch3.xhtml"]
    );
}

#[test]
fn test_split_ncx_book() {
    let book = read(ncx_epub());
    let chapters = split_book(&book, |_| {});

    assert_eq!(
        chapters,
        vec![
            Chapter {
                title: "Part One|Opening".into(),
                content: "Opening\nIt began at dawn.".into(),
            },
            Chapter {
                title: "Part One|Journey".into(),
                content: "Journey\nThey walked for days.\nStill walking.\nThe road ended.".into(),
            },
            Chapter {
                title: "Arrival".into(),
                content: "Arrival\nHome at last.".into(),
            },
        ]
    );
}

#[test]
fn test_progress_sees_every_chapter_in_order() {
    let book = read(ncx_epub());
    let mut titles = Vec::new();
    let chapters = split_book(&book, |c| titles.push(c.title.clone()));

    let expected: Vec<_> = chapters.iter().map(|c| c.title.clone()).collect();
    assert_eq!(titles, expected);
}

#[test]
fn test_split_nav_book() {
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Nav Only</dc:title>
    <dc:identifier id="id">urn:test:nav</dc:identifier>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="one" href="one.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="one"/></spine>
</package>"#;
    let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc"><ol>
    <li><a href="one.xhtml#s1">Section</a></li>
    <li><a href="one.xhtml#s2">Section</a></li>
  </ol></nav>
</body>
</html>"#;
    let epub = build_epub(&[
        ("OEBPS/content.opf", opf.into()),
        ("OEBPS/nav.xhtml", nav.into()),
        (
            "OEBPS/one.xhtml",
            page(r#"<h2 id="s1">First</h2><p>one</p><h2 id="s2">Second</h2><p>two</p>"#).into(),
        ),
    ]);

    let chapters = split_book(&read(epub), |_| {});

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Section");
    assert_eq!(chapters[0].content, "First\none");
    assert_eq!(chapters[1].title, "Section2");
    assert_eq!(chapters[1].content, "Second\ntwo");
}

#[test]
fn test_legacy_encoded_document() {
    let (gbk, _, _) = encoding_rs::GBK.encode(
        r#"<?xml version="1.0" encoding="gbk"?>
<html><head><title>t</title></head><body>
<h1 id="c1">序章</h1><p>祈祷之海</p>
</body></html>"#,
    );
    let opf = flat_opf(&[("ch1", "Text/ch1.xhtml")]);
    let ncx = flat_ncx(&[("序章", "Text/ch1.xhtml#c1")]);
    let epub = build_epub(&[
        ("OEBPS/content.opf", opf.into_bytes()),
        ("OEBPS/toc.ncx", ncx.into_bytes()),
        ("OEBPS/Text/ch1.xhtml", gbk.into_owned()),
    ]);

    let chapters = split_book(&read(epub), |_| {});

    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "序章");
    assert_eq!(chapters[0].content, "序章\n祈祷之海");
}

#[test]
fn test_percent_encoded_file_names() {
    let opf = flat_opf(&[
        ("ch1", "Text/%E7%AB%A0%201.xhtml"),
        ("ch2", "Text/%E7%AB%A0%202.xhtml"),
    ]);
    let ncx = flat_ncx(&[
        ("Opening", "Text/%E7%AB%A0%201.xhtml#open"),
        ("Journey", "Text/%E7%AB%A0%201.xhtml#journey"),
        ("Arrival", "Text/%E7%AB%A0%202.xhtml#arrival"),
    ]);
    let epub = build_epub(&[
        ("OEBPS/content.opf", opf.into_bytes()),
        ("OEBPS/toc.ncx", ncx.into_bytes()),
        (
            "OEBPS/Text/章 1.xhtml",
            page(r#"<h1 id="open">Open</h1><p>o</p><h1 id="journey">Walk</h1><p>w</p>"#).into(),
        ),
        (
            "OEBPS/Text/章 2.xhtml",
            page(r#"<p>road</p><h1 id="arrival">A</h1>"#).into(),
        ),
    ]);

    let book = read(epub);
    let documents: Vec<_> = book.content_documents().map(|(name, _)| name).collect();
    assert_eq!(documents, vec!["OEBPS/Text/章 1.xhtml", "OEBPS/Text/章 2.xhtml"]);

    let contents: Vec<_> = split_book(&book, |_| {})
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert_eq!(contents, vec!["Open\no", "Walk\nw\nroad", "A"]);
}

#[test]
fn test_self_closing_anchors() {
    let opf = flat_opf(&[("ch1", "ch1.xhtml")]);
    let ncx = flat_ncx(&[("Start", "ch1.xhtml#s"), ("End", "ch1.xhtml#e")]);
    let epub = build_epub(&[
        ("OEBPS/content.opf", opf.into_bytes()),
        ("OEBPS/toc.ncx", ncx.into_bytes()),
        (
            "OEBPS/ch1.xhtml",
            page(r#"<a id="s"/><p>X</p><p>Y</p><a id="e"/><p>Z</p>"#).into(),
        ),
    ]);

    let chapters = split_book(&read(epub), |_| {});

    assert_eq!(
        chapters,
        vec![
            Chapter {
                title: "Start".into(),
                content: "X\nY".into(),
            },
            Chapter {
                title: "End".into(),
                content: "Z".into(),
            },
        ]
    );
}

#[test]
fn test_missing_container_is_an_error() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    let data = zip.finish().unwrap().into_inner();

    assert!(read_epub_from_reader(Cursor::new(data)).is_err());
}

#[test]
fn test_save_json_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let epub_path = dir.path().join("book.epub");
    std::fs::write(&epub_path, ncx_epub()).unwrap();

    let first = dir.path().join("first.json");
    let second = dir.path().join("out/second.json");
    for path in [&first, &second] {
        let book = read_epub(&epub_path).unwrap();
        save_chapters(path, &split_book(&book, |_| {})).unwrap();
    }

    let a = std::fs::read(&first).unwrap();
    let b = std::fs::read(&second).unwrap();
    assert_eq!(a, b);

    let parsed: Vec<Chapter> = serde_json::from_slice(&a).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].title, "Arrival");
}

#[test]
fn test_cli_writes_json_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let epub_path = dir.path().join("book.epub");
    std::fs::write(&epub_path, ncx_epub()).unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_bookslice"))
        .arg(&epub_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["Part One|Opening", "Part One|Journey", "Arrival"]
    );

    let json = std::fs::read_to_string(dir.path().join("book.json")).unwrap();
    assert!(json.contains("\"title\": \"Part One|Journey\""));
}

#[test]
fn test_cli_reports_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.epub");
    std::fs::write(&path, b"not a zip").unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_bookslice"))
        .args(["--quiet"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}

proptest! {
    #[test]
    fn chapters_follow_bookmarks(titles in prop::collection::vec("[a-c]{1,2}", 1..12)) {
        let body: String = titles
            .iter()
            .enumerate()
            .map(|(i, _)| format!(r#"<h1 id="s{i}">Heading {i}</h1><p>body {i}</p>"#))
            .collect();
        let store = MemoryStore::new().with_document("book/all.xhtml", page(&body));
        let toc: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| TocNode::Leaf {
                title: title.clone(),
                href: format!("all.xhtml#s{i}"),
            })
            .collect();

        let bookmarks = extract_bookmarks(&toc);
        let chapters = ChapterSlicer::new(&store).split(&bookmarks, |_| {});

        prop_assert_eq!(chapters.len(), bookmarks.len());
        for (i, (chapter, bookmark)) in chapters.iter().zip(&bookmarks).enumerate() {
            prop_assert_eq!(&chapter.title, &bookmark.title);
            prop_assert_eq!(&chapter.content, &format!("Heading {i}\nbody {i}"));
        }
    }
}
