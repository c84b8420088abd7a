//! rasff-core: appends dated sheets to `.xlsx` workbooks.
//!
//! The package is edited at the zip + SpreadsheetML level: every part is held
//! in memory, new sheets and rows are spliced into the XML, and `save`
//! writes the whole archive back in one go.

mod package;
mod read_part;
mod template;
mod test;
mod xml;

use anyhow::{Context, Result, bail};
use quick_xml::{Writer, events::BytesText};
use regex::Regex;

use package::Part;

use template::{
    CONTENT_TYPES_PART, EMPTY_SHEET, RELATIONSHIPS_NS, WORKBOOK_PART, WORKBOOK_RELS_PART,
    WORKSHEET_CONTENT_TYPE, WORKSHEET_REL_TYPE,
};

/// Title the format's libraries give the single sheet of a new workbook.
pub const DEFAULT_SHEET_TITLE: &str = "Sheet";

/// Longest sheet title Excel accepts.
pub(crate) const MAX_SHEET_TITLE_LEN: usize = 31;

/// `Workbook` holds an xlsx package in memory and appends sheets and rows
/// to it. Only one sheet, the one most recently added, is open for writing.
pub struct Workbook {
    parts: Vec<Part>,
    sheet_path: Option<String>,
    sheet_xml: Vec<u8>,
    last_row: u32,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A fresh workbook with one empty sheet titled [`DEFAULT_SHEET_TITLE`].
    pub fn new() -> Self {
        use template::*;
        let parts = [
            (CONTENT_TYPES_PART, CONTENT_TYPES),
            (ROOT_RELS_PART, ROOT_RELS),
            (WORKBOOK_PART, WORKBOOK),
            (WORKBOOK_RELS_PART, WORKBOOK_RELS),
            (STYLES_PART, STYLES),
            ("xl/worksheets/sheet1.xml", EMPTY_SHEET),
        ]
        .into_iter()
        .map(|(name, xml)| Part::new(name, xml.as_bytes().to_vec()))
        .collect();

        Self {
            parts,
            sheet_path: None,
            sheet_xml: Vec::new(),
            last_row: 0,
        }
    }

    /// Sheet titles in tab order.
    pub fn sheet_names(&self) -> Result<Vec<String>> {
        let sheets = xml::find_elements(self.part(WORKBOOK_PART)?, b"sheet")?;
        Ok(sheets
            .iter()
            .filter_map(|s| s.attr("name").map(str::to_owned))
            .collect())
    }

    /// Removes the first sheet titled `title` together with its relationship,
    /// content-type override and worksheet part.
    pub fn remove_sheet(&mut self, title: &str) -> Result<()> {
        self.flush_current_sheet();

        let sheet = xml::find_elements(self.part(WORKBOOK_PART)?, b"sheet")?
            .into_iter()
            .find(|s| s.attr("name") == Some(title))
            .with_context(|| format!("Sheet '{title}' not found"))?;
        let rid = sheet
            .attr("id")
            .with_context(|| format!("Sheet '{title}' has no r:id"))?
            .to_owned();

        let rel = xml::find_elements(self.part(WORKBOOK_RELS_PART)?, b"Relationship")?
            .into_iter()
            .find(|r| r.attr("Id") == Some(rid.as_str()));

        self.part_mut(WORKBOOK_PART)?.data.drain(sheet.span);

        if let Some(rel) = rel {
            let target = rel.attr("Target").map(resolve_target);
            self.part_mut(WORKBOOK_RELS_PART)?.data.drain(rel.span);

            if let Some(target) = target {
                let part_name = format!("/{target}");
                let ct = xml::find_elements(self.part(CONTENT_TYPES_PART)?, b"Override")?
                    .into_iter()
                    .find(|o| o.attr("PartName") == Some(part_name.as_str()));
                if let Some(ct) = ct {
                    self.part_mut(CONTENT_TYPES_PART)?.data.drain(ct.span);
                }
                if self.sheet_path.as_deref() == Some(target.as_str()) {
                    self.sheet_path = None;
                    self.sheet_xml.clear();
                    self.last_row = 0;
                }
                self.parts.retain(|p| p.name != target);
            }
        }
        Ok(())
    }

    /// Adds a new empty sheet at the end of the tab order and switches the
    /// editor to it. A taken title gets a numeric suffix (`Title1`, `Title2`,
    /// ...); the title actually used is returned.
    pub fn add_worksheet(&mut self, title: &str) -> Result<String> {
        validate_sheet_title(title)?;
        let title = unique_sheet_title(title, &self.sheet_names()?)?;

        // перед переключением сохраняем изменённый текущий лист
        self.flush_current_sheet();

        // свободные sheetId / rId / sheet#.xml
        let new_sheet_id = xml::find_elements(self.part(WORKBOOK_PART)?, b"sheet")?
            .iter()
            .filter_map(|s| s.attr("sheetId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let new_rid = xml::find_elements(self.part(WORKBOOK_RELS_PART)?, b"Relationship")?
            .iter()
            .filter_map(|r| r.attr("Id")?.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let new_sheet_file = self
            .parts
            .iter()
            .filter_map(|p| {
                p.name
                    .strip_prefix("xl/worksheets/sheet")
                    .and_then(|s| s.strip_suffix(".xml"))
                    .and_then(|s| s.parse::<usize>().ok())
            })
            .max()
            .unwrap_or(0)
            + 1;
        let new_sheet_path = format!("xl/worksheets/sheet{new_sheet_file}.xml");

        // новые теги получают тот же префикс, что и их контейнер
        let (sheet_tag, bind_r) = {
            let wb = self.part(WORKBOOK_PART)?;
            let p = xml::prefix_of(wb, b"sheets")?;
            let tag = format!(
                r#"<{p}sheet name="{}" sheetId="{}" r:id="rId{}""#,
                xml::xml_escape(&title),
                new_sheet_id,
                new_rid
            );
            (tag, memchr::memmem::find(wb, b"xmlns:r=").is_none())
        };
        let sheet_tag = if bind_r {
            format!(r#"{sheet_tag} xmlns:r="{RELATIONSHIPS_NS}"/>"#)
        } else {
            format!("{sheet_tag}/>")
        };
        let rel_tag = {
            let p = xml::prefix_of(self.part(WORKBOOK_RELS_PART)?, b"Relationships")?;
            format!(
                r#"<{p}Relationship Id="rId{new_rid}" Type="{WORKSHEET_REL_TYPE}" Target="worksheets/sheet{new_sheet_file}.xml"/>"#
            )
        };
        let override_tag = {
            let p = xml::prefix_of(self.part(CONTENT_TYPES_PART)?, b"Types")?;
            format!(
                r#"<{p}Override PartName="/{new_sheet_path}" ContentType="{WORKSHEET_CONTENT_TYPE}"/>"#
            )
        };

        xml::append_child(
            &mut self.part_mut(WORKBOOK_PART)?.data,
            b"sheets",
            sheet_tag.as_bytes(),
        )
        .context("workbook.xml has no <sheets>")?;
        xml::append_child(
            &mut self.part_mut(WORKBOOK_RELS_PART)?.data,
            b"Relationships",
            rel_tag.as_bytes(),
        )
        .context("workbook.xml.rels has no <Relationships>")?;
        xml::append_child(
            &mut self.part_mut(CONTENT_TYPES_PART)?.data,
            b"Types",
            override_tag.as_bytes(),
        )
        .context("[Content_Types].xml has no <Types>")?;

        self.parts
            .push(Part::new(&new_sheet_path, EMPTY_SHEET.as_bytes().to_vec()));

        // переключаем редактор на новый лист
        self.sheet_path = Some(new_sheet_path);
        self.sheet_xml = EMPTY_SHEET.as_bytes().to_vec();
        self.last_row = 0;

        Ok(title)
    }

    /// Appends a single row after the last row of the current sheet.
    ///
    /// Every value is written as an inline string exactly as given: no number
    /// or formula detection, surrounding whitespace kept.
    pub fn append_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.sheet_path.is_none() {
            bail!("no sheet is open for writing; call add_worksheet first");
        }

        let row_num = self.last_row + 1;
        let mut writer = Writer::new(Vec::new());
        let mut illegal = None;

        writer
            .create_element("row")
            .with_attribute(("r", row_num.to_string().as_str()))
            .write_inner_content(|w| {
                for (col_idx, val) in cells.into_iter().enumerate() {
                    let val = val.as_ref();
                    let coord = format!("{}{}", xml::col_idx_to_letters(col_idx), row_num);
                    if illegal.is_none() && !val.chars().all(xml::is_xml_char) {
                        illegal = Some(coord.clone());
                    }
                    w.create_element("c")
                        .with_attribute(("r", coord.as_str()))
                        .with_attribute(("t", "inlineStr"))
                        .write_inner_content(|w2| {
                            w2.create_element("is").write_inner_content(|w3| {
                                w3.create_element("t")
                                    .with_attribute(("xml:space", "preserve"))
                                    .write_text_content(BytesText::new(val))?;
                                Ok(())
                            })?;
                            Ok(())
                        })?;
                }
                Ok(())
            })?;

        if let Some(coord) = illegal {
            bail!("cell {coord} contains a character that cannot be stored in xlsx");
        }

        xml::insert_before(&mut self.sheet_xml, b"</sheetData>", &writer.into_inner())?;
        self.last_row = row_num;
        Ok(())
    }

    /// Number of rows written to the current sheet.
    #[cfg(test)]
    pub(crate) fn current_row_count(&self) -> u32 {
        self.last_row
    }

    fn part(&self, name: &str) -> Result<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
            .with_context(|| format!("{name} not found"))
    }

    fn part_mut(&mut self, name: &str) -> Result<&mut Part> {
        self.parts
            .iter_mut()
            .find(|p| p.name == name)
            .with_context(|| format!("{name} not found"))
    }

    /// Copies the sheet being edited back into its part.
    fn flush_current_sheet(&mut self) {
        let Some(path) = self.sheet_path.as_deref() else {
            return;
        };
        if let Some(part) = self.parts.iter_mut().find(|p| p.name == path) {
            part.data.clone_from(&self.sheet_xml);
        }
    }
}

/// Relationship targets are relative to `xl/` unless they start with `/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(abs) => abs.to_owned(),
        None => format!("xl/{target}"),
    }
}

fn validate_sheet_title(title: &str) -> Result<()> {
    if title.is_empty() {
        bail!("sheet title must not be empty");
    }
    if title.chars().count() > MAX_SHEET_TITLE_LEN {
        bail!("sheet title '{title}' is longer than {MAX_SHEET_TITLE_LEN} characters");
    }
    if let Some(c) = title.chars().find(|c| "[]:*?/\\".contains(*c)) {
        bail!("sheet title '{title}' contains forbidden character '{c}'");
    }
    Ok(())
}

/// `title` if free, otherwise `title` followed by one more than the highest
/// numeric suffix already in use. Comparison ignores case, as Excel does.
/// Fails when the suffixed title no longer fits.
fn unique_sheet_title(title: &str, existing: &[String]) -> Result<String> {
    if !existing.iter().any(|n| n.eq_ignore_ascii_case(title)) {
        return Ok(title.to_owned());
    }
    let pattern = Regex::new(&format!(r"(?i)^{}(\d*)$", regex::escape(title)))?;
    let highest = existing
        .iter()
        .filter_map(|n| pattern.captures(n))
        .map(|c| c[1].parse::<u32>().unwrap_or(0))
        .max()
        .unwrap_or(0);
    let suffixed = format!("{title}{}", highest + 1);
    validate_sheet_title(&suffixed)
        .with_context(|| format!("sheet title '{title}' is taken"))?;
    Ok(suffixed)
}
