//! In-memory EPUB fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub struct EpubBuilder {
    title: String,
    author: String,
    chapters: Vec<(String, String)>,
    images: Vec<(String, Vec<u8>)>,
    cover: Option<usize>,
    mimetype: String,
    container: bool,
}

impl EpubBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: "Test Author".to_string(),
            chapters: Vec::new(),
            images: Vec::new(),
            cover: None,
            mimetype: "application/epub+zip".to_string(),
            container: true,
        }
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    /// Add a chapter; `body` is the inner markup of `<body>`.
    pub fn chapter(mut self, title: &str, body: &str) -> Self {
        self.chapters.push((title.to_string(), body.to_string()));
        self
    }

    pub fn image(mut self, name: &str, data: &[u8]) -> Self {
        self.images.push((name.to_string(), data.to_vec()));
        self
    }

    /// Declare the most recently added image as the cover.
    pub fn with_cover(mut self) -> Self {
        self.cover = self.images.len().checked_sub(1);
        self
    }

    pub fn mimetype(mut self, mimetype: &str) -> Self {
        self.mimetype = mimetype.to_string();
        self
    }

    pub fn without_container(mut self) -> Self {
        self.container = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(self.mimetype.as_bytes()).unwrap();

        if self.container {
            zip.start_file("META-INF/container.xml", deflated).unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            )
            .unwrap();
        }

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
        zip.write_all(self.ncx().as_bytes()).unwrap();

        for (i, (title, body)) in self.chapters.iter().enumerate() {
            zip.start_file(format!("OEBPS/text/ch{i}.xhtml"), deflated).unwrap();
            let page = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title><style>p {{ margin: 0 }}</style></head>
<body>{body}</body>
</html>"#
            );
            zip.write_all(page.as_bytes()).unwrap();
        }

        for (name, data) in &self.images {
            zip.start_file(format!("OEBPS/images/{name}"), stored).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    /// Write the archive into `dir` as `name`.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    fn opf(&self) -> String {
        let mut manifest = String::from(
            r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
"#,
        );
        let mut spine = String::new();
        for i in 0..self.chapters.len() {
            manifest.push_str(&format!(
                "    <item id=\"ch{i}\" href=\"text/ch{i}.xhtml\" media-type=\"application/xhtml+xml\"/>\n"
            ));
            spine.push_str(&format!("    <itemref idref=\"ch{i}\"/>\n"));
        }
        for (i, (name, _)) in self.images.iter().enumerate() {
            let media_type = if name.ends_with(".png") { "image/png" } else { "image/jpeg" };
            manifest.push_str(&format!(
                "    <item id=\"img{i}\" href=\"images/{name}\" media-type=\"{media_type}\"/>\n"
            ));
        }
        let cover = self
            .cover
            .map(|i| format!("    <meta name=\"cover\" content=\"img{i}\"/>\n"))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:description>A fixture book.</dc:description>
{cover}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>"#,
            title = self.title,
            author = self.author,
        )
    }

    fn ncx(&self) -> String {
        let points: String = self
            .chapters
            .iter()
            .enumerate()
            .map(|(i, (title, _))| {
                format!(
                    r#"    <navPoint id="np{i}" playOrder="{order}">
      <navLabel><text>{title}</text></navLabel>
      <content src="text/ch{i}.xhtml"/>
    </navPoint>
"#,
                    order = i + 1
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:fixture"/></head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>"#,
            title = self.title
        )
    }
}

/// A short two-chapter book.
pub fn sample_book() -> EpubBuilder {
    EpubBuilder::new("Sample")
        .author("Ada Writer")
        .chapter("Opening", "<h1>Opening</h1><p>Hello, world.</p><p>New paragraph.</p>")
        .chapter(
            "Second",
            r#"<p>The cat sat on the mat.</p><p><img src="../images/pic.png" alt="pic"/></p>"#,
        )
        .image("pic.png", b"\x89PNG fake")
        .with_cover()
}
