#[cfg(test)]
use crate::{DEFAULT_SHEET_TITLE, MAX_SHEET_TITLE_LEN, Workbook, xml};
#[cfg(test)]
use anyhow::Result;
#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use std::io::Cursor;

#[cfg(test)]
fn zip_package(parts: &[(&str, &str)]) -> Result<Cursor<Vec<u8>>> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zout = zip::ZipWriter::new(&mut buf);
        let opt: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default();
        for (name, data) in parts {
            zout.start_file(*name, opt)?;
            std::io::Write::write_all(&mut zout, data.as_bytes())?;
        }
        zout.finish()?;
    }
    buf.set_position(0);
    Ok(buf)
}

#[cfg(test)]
fn scratch_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[test]
fn new_workbook_has_default_sheet() -> Result<()> {
    let book = Workbook::new();
    assert_eq!(book.sheet_names()?, vec![DEFAULT_SHEET_TITLE.to_owned()]);
    Ok(())
}

#[test]
fn remove_default_sheet_leaves_no_sheets() -> Result<()> {
    let mut book = Workbook::new();
    book.remove_sheet(DEFAULT_SHEET_TITLE)?;
    assert!(book.sheet_names()?.is_empty());
    assert!(book.remove_sheet(DEFAULT_SHEET_TITLE).is_err());
    Ok(())
}

#[test]
fn add_worksheet_and_append_rows() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("book.xlsx");

    let mut book = Workbook::new();
    book.remove_sheet(DEFAULT_SHEET_TITLE)?;
    let title = book.add_worksheet("Notifications_20240415")?;
    assert_eq!(title, "Notifications_20240415");
    book.append_row(["Title", "Link", "Notified"])?;
    book.append_row(["Alert A", "http://x/1", "Details A"])?;
    assert_eq!(book.current_row_count(), 2);
    book.save(&path)?;

    let reopened = Workbook::open(&path)?;
    assert_eq!(reopened.sheet_names()?, vec![title.clone()]);
    assert_eq!(
        reopened.rows(&title)?,
        vec![
            vec!["Title", "Link", "Notified"],
            vec!["Alert A", "http://x/1", "Details A"],
        ]
    );
    Ok(())
}

#[test]
fn rows_of_unsaved_sheet_are_visible() -> Result<()> {
    let mut book = Workbook::new();
    let title = book.add_worksheet("Draft")?;
    book.append_row(["a", "b"])?;
    assert_eq!(book.rows(&title)?, vec![vec!["a", "b"]]);
    Ok(())
}

#[test]
fn values_are_written_verbatim() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("verbatim.xlsx");

    let row = [
        "  padded  ",
        "=SUM(A1:A2)",
        "12.5",
        "Salmonella <spp.> & \"Listeria\"",
        "",
    ];
    let mut book = Workbook::new();
    let title = book.add_worksheet("Raw")?;
    book.append_row(row)?;
    book.save(&path)?;

    let rows = Workbook::open(&path)?.rows(&title)?;
    assert_eq!(rows, vec![row.iter().map(|s| s.to_string()).collect::<Vec<_>>()]);
    Ok(())
}

#[test]
fn reopen_preserves_existing_sheets() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("keep.xlsx");

    let mut first = Workbook::new();
    first.remove_sheet(DEFAULT_SHEET_TITLE)?;
    first.add_worksheet("Notifications_20240415")?;
    first.append_row(["Title", "Link", "Notified"])?;
    first.append_row(["old", "http://x/old", "kept"])?;
    first.save(&path)?;

    let mut second = Workbook::open(&path)?;
    second.add_worksheet("Notifications_20240416")?;
    second.append_row(["Title", "Link", "Notified"])?;
    second.save(&path)?;

    let book = Workbook::open(&path)?;
    assert_eq!(
        book.sheet_names()?,
        vec!["Notifications_20240415", "Notifications_20240416"]
    );
    assert_eq!(
        book.rows("Notifications_20240415")?[1],
        vec!["old", "http://x/old", "kept"]
    );
    assert_eq!(book.rows("Notifications_20240416")?.len(), 1);
    Ok(())
}

#[test]
fn taken_title_gets_numeric_suffix() -> Result<()> {
    let mut book = Workbook::new();
    assert_eq!(book.add_worksheet("Notifications_20240415")?, "Notifications_20240415");
    assert_eq!(book.add_worksheet("Notifications_20240415")?, "Notifications_202404151");
    assert_eq!(book.add_worksheet("notifications_20240415")?, "notifications_202404152");
    assert_eq!(book.add_worksheet("sheet")?, "sheet1");
    assert_eq!(book.sheet_names()?.len(), 5);
    Ok(())
}

#[test]
fn invalid_titles_are_rejected() {
    let mut book = Workbook::new();
    assert!(book.add_worksheet("").is_err());
    assert!(book.add_worksheet("a/b").is_err());
    assert!(book.add_worksheet("[x]").is_err());
    assert!(book.add_worksheet(&"x".repeat(32)).is_err());
}

#[test]
fn append_without_sheet_fails() {
    let mut book = Workbook::new();
    assert!(book.append_row(["x"]).is_err());
}

#[test]
fn control_characters_are_rejected() -> Result<()> {
    let mut book = Workbook::new();
    book.add_worksheet("Raw")?;
    let err = book.append_row(["fine", "bad\u{1}"]).unwrap_err();
    assert!(err.to_string().contains("B1"));
    assert_eq!(book.current_row_count(), 0);
    Ok(())
}

#[test]
fn garbage_is_not_a_workbook() {
    assert!(Workbook::from_reader(Cursor::new(b"definitely not a zip".to_vec())).is_err());
}

#[test]
fn zip_without_workbook_part_is_rejected() -> Result<()> {
    let buf = zip_package(&[("hello.txt", "hi")])?;
    assert!(Workbook::from_reader(buf).is_err());
    Ok(())
}

#[test]
fn new_sheet_gets_fresh_ids() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("ids.xlsx");

    let mut book = Workbook::new();
    book.add_worksheet("Second")?;
    book.append_row(["s"])?;
    book.remove_sheet(DEFAULT_SHEET_TITLE)?;
    book.add_worksheet("Third")?;
    book.append_row(["t"])?;
    book.save(&path)?;

    let book = Workbook::open(&path)?;
    assert_eq!(book.sheet_names()?, vec!["Second", "Third"]);
    assert_eq!(book.rows("Second")?, vec![vec!["s"]]);
    assert_eq!(book.rows("Third")?, vec![vec!["t"]]);
    Ok(())
}

#[test]
fn many_columns_use_two_letter_refs() -> Result<()> {
    let mut book = Workbook::new();
    let title = book.add_worksheet("Wide")?;
    let cells: Vec<String> = (0..30).map(|i| i.to_string()).collect();
    book.append_row(&cells)?;
    assert_eq!(book.rows(&title)?, vec![cells]);
    Ok(())
}

// Package laid out the way Excel and openpyxl write it: absolute targets,
// shared strings, a theme and docProps.
#[cfg(test)]
const EXCEL_PARTS: &[(&str, &str)] = &[
    (
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#,
    ),
    (
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#,
    ),
    (
        "docProps/app.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Microsoft Excel</Application></Properties>"#,
    ),
    (
        "docProps/core.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>analyst</dc:creator></cp:coreProperties>"#,
    ),
    (
        "xl/workbook.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><bookViews><workbookView activeTab="0"/></bookViews><sheets><sheet name="Notifications_20240414" sheetId="1" state="visible" r:id="rId1"/></sheets><calcPr calcId="124519" fullCalcOnLoad="1"/></workbook>"#,
    ),
    (
        "xl/_rels/workbook.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/></Relationships>"#,
    ),
    (
        "xl/theme/theme1.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"/>"#,
    ),
    (
        "xl/sharedStrings.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="5" uniqueCount="5"><si><t>Title</t></si><si><t>Link</t></si><si><t>Notified</t></si><si><r><t>Listeria </t></r><r><rPr><b/></rPr><t>in cheese</t></r></si><si><t>http://x/old</t></si></sst>"#,
    ),
    (
        "xl/worksheets/sheet1.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetPr><outlinePr summaryBelow="1" summaryRight="1"/></sheetPr><dimension ref="A1:D2"/><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row><row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2" t="s"><v>4</v></c><c r="C2"><v>42</v></c><c r="D2" s="1"/></row></sheetData></worksheet>"#,
    ),
];

#[test]
fn excel_written_workbook_keeps_its_sheet() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("excel.xlsx");

    let mut book = Workbook::from_reader(zip_package(EXCEL_PARTS)?)?;
    assert_eq!(book.sheet_names()?, vec!["Notifications_20240414"]);
    assert_eq!(
        book.rows("Notifications_20240414")?,
        vec![
            vec!["Title", "Link", "Notified"],
            vec!["Listeria in cheese", "http://x/old", "42", ""],
        ]
    );

    let title = book.add_worksheet("Notifications_20240415")?;
    book.append_row(["Title", "Link", "Notified"])?;
    book.append_row(["Alert A", "http://x/1", "Details A"])?;
    book.save(&path)?;

    let book = Workbook::open(&path)?;
    assert_eq!(
        book.sheet_names()?,
        vec!["Notifications_20240414", "Notifications_20240415"]
    );
    assert_eq!(
        book.rows("Notifications_20240414")?[1],
        vec!["Listeria in cheese", "http://x/old", "42", ""]
    );
    assert_eq!(
        book.rows(&title)?,
        vec![
            vec!["Title", "Link", "Notified"],
            vec!["Alert A", "http://x/1", "Details A"],
        ]
    );
    // sheet1 is taken, theme and docProps survive
    let names: Vec<&str> = book.parts.iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"xl/worksheets/sheet2.xml"));
    assert!(names.contains(&"xl/theme/theme1.xml"));
    assert!(names.contains(&"docProps/core.xml"));
    Ok(())
}

#[test]
fn removing_sheet_with_absolute_target_drops_its_part() -> Result<()> {
    let mut book = Workbook::from_reader(zip_package(EXCEL_PARTS)?)?;
    book.remove_sheet("Notifications_20240414")?;
    assert!(book.sheet_names()?.is_empty());
    assert!(!book.parts.iter().any(|p| p.name == "xl/worksheets/sheet1.xml"));
    Ok(())
}

#[test]
fn prefixed_workbook_accepts_new_sheet() -> Result<()> {
    let dir = scratch_dir();
    let path = dir.path().join("prefixed.xlsx");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="utf-8"?><ct:Types xmlns:ct="http://schemas.openxmlformats.org/package/2006/content-types"><ct:Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><ct:Default Extension="xml" ContentType="application/xml"/><ct:Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></ct:Types>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="utf-8"?><x:workbook xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheets/></x:workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="utf-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#,
        ),
    ];

    let mut book = Workbook::from_reader(zip_package(&parts)?)?;
    assert!(book.sheet_names()?.is_empty());
    let title = book.add_worksheet("Notifications_20240415")?;
    book.append_row(["Title", "Link", "Notified"])?;
    book.save(&path)?;

    let book = Workbook::open(&path)?;
    assert_eq!(book.sheet_names()?, vec![title.clone()]);
    assert_eq!(book.rows(&title)?, vec![vec!["Title", "Link", "Notified"]]);

    let workbook = String::from_utf8(book.part("xl/workbook.xml")?.to_vec())?;
    assert!(workbook.contains(r#"<x:sheet name="Notifications_20240415""#));
    assert!(workbook.contains("</x:sheets>"));
    assert!(workbook.contains("xmlns:r="));
    let types = String::from_utf8(book.part("[Content_Types].xml")?.to_vec())?;
    assert!(types.contains(r#"<ct:Override PartName="/xl/worksheets/sheet1.xml""#));
    Ok(())
}

#[test]
fn append_child_finds_prefixed_close_tag() -> Result<()> {
    let mut doc = b"<x:a xmlns:x=\"u\"><x:b/></x:a>".to_vec();
    xml::append_child(&mut doc, b"a", b"<x:c/>")?;
    assert_eq!(doc, b"<x:a xmlns:x=\"u\"><x:b/><x:c/></x:a>".to_vec());

    let mut empty = b"<root><x:list/></root>".to_vec();
    xml::append_child(&mut empty, b"list", b"<x:item/>")?;
    assert_eq!(empty, b"<root><x:list><x:item/></x:list></root>".to_vec());

    assert!(xml::append_child(&mut empty, b"missing", b"<y/>").is_err());
    Ok(())
}

#[test]
fn full_length_title_cannot_take_a_suffix() -> Result<()> {
    let mut book = Workbook::new();
    let title = "N".repeat(MAX_SHEET_TITLE_LEN);
    assert_eq!(book.add_worksheet(&title)?, title);
    assert!(book.add_worksheet(&title).is_err());
    assert_eq!(book.sheet_names()?.len(), 2);

    let shorter = "N".repeat(MAX_SHEET_TITLE_LEN - 1);
    assert_eq!(book.add_worksheet(&shorter)?, shorter);
    assert_eq!(book.add_worksheet(&shorter)?, format!("{shorter}1"));
    Ok(())
}
