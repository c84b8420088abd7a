use crate::Workbook;
use crate::template::{SHARED_STRINGS_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};
use crate::xml;
use anyhow::{Context, Result};
use quick_xml::{Reader, escape::unescape, events::Event, name::QName};

impl Workbook {
    /// Reads the first sheet titled `title` back as rows of cell text.
    ///
    /// Inline strings, shared strings and plain `<v>` values are returned as
    /// text; gaps between cells come back as empty strings.
    pub fn rows(&self, title: &str) -> Result<Vec<Vec<String>>> {
        let sheet = xml::find_elements(self.part(WORKBOOK_PART)?, b"sheet")?
            .into_iter()
            .find(|s| s.attr("name") == Some(title))
            .with_context(|| format!("Sheet '{title}' not found"))?;
        let rid = sheet.attr("id").context("sheet without r:id")?;
        let target = xml::find_elements(self.part(WORKBOOK_RELS_PART)?, b"Relationship")?
            .into_iter()
            .find(|r| r.attr("Id") == Some(rid))
            .and_then(|r| r.attr("Target").map(crate::resolve_target))
            .with_context(|| format!("no relationship {rid} for sheet '{title}'"))?;

        let sheet_xml = if self.sheet_path.as_deref() == Some(target.as_str()) {
            self.sheet_xml.as_slice()
        } else {
            self.part(&target)?
        };
        let shared = match self.part(SHARED_STRINGS_PART) {
            Ok(sst) => parse_shared_strings(sst)?,
            Err(_) => Vec::new(),
        };
        parse_rows(sheet_xml, &shared)
    }
}

fn read_text(reader: &mut Reader<&[u8]>, end: QName<'_>) -> Result<String> {
    let raw = reader.read_text(end)?;
    Ok(unescape(&raw)?.into_owned())
}

fn parse_shared_strings(sst: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(sst);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    // фонетические подсказки (<rPh>) не входят в значение
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" => {
                    let text = read_text(&mut reader, e.name())?;
                    if let (Some(s), false) = (current.as_mut(), in_phonetic) {
                        s.push_str(&text);
                    }
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct CellState {
    col: usize,
    kind: Option<String>,
    value: String,
}

fn parse_rows(sheet_xml: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(sheet_xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<CellState> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Vec::new(),
                b"c" => cell = Some(cell_state(&e, row.len())),
                b"t" | b"v" => {
                    let text = read_text(&mut reader, e.name())?;
                    if let Some(c) = cell.as_mut() {
                        c.value.push_str(&text);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let state = cell_state(&e, row.len());
                    place(&mut row, state, shared);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(c) = cell.take() {
                        place(&mut row, c, shared);
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn cell_state(e: &quick_xml::events::BytesStart<'_>, next_col: usize) -> CellState {
    let mut state = CellState {
        col: next_col,
        ..CellState::default()
    };
    for a in e.attributes().with_checks(false).flatten() {
        match a.key.as_ref() {
            b"r" => {
                if let Some(col) = xml::col_of_ref(&String::from_utf8_lossy(&a.value)) {
                    state.col = col;
                }
            }
            b"t" => state.kind = Some(String::from_utf8_lossy(&a.value).into_owned()),
            _ => {}
        }
    }
    state
}

fn place(row: &mut Vec<String>, cell: CellState, shared: &[String]) {
    let text = match cell.kind.as_deref() {
        Some("s") => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        _ => cell.value,
    };
    if row.len() < cell.col {
        row.resize(cell.col, String::new());
    }
    if row.len() == cell.col {
        row.push(text);
    } else {
        row[cell.col] = text;
    }
}
