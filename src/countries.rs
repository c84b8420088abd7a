//! RASFF country codes shown by `--list-countries`.

/// A member country and the numeric code its feed is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    pub code: &'static str,
}

const fn country(name: &'static str, code: &'static str) -> Country {
    Country { name, code }
}

/// Code that selects the feed of all EU Single Market notifications.
pub const ALL: &str = "all";

/// Display order follows the alphabetical country names.
pub const COUNTRIES: &[Country] = &[
    country("AUSTRIA", "5001"),
    country("BELGIUM", "5002"),
    country("BULGARIA", "5003"),
    country("CROATIA", "5016"),
    country("CYPRUS", "5005"),
    country("CZECH REPUBLIC", "5006"),
    country("DENMARK", "5008"),
    country("ESTONIA", "5009"),
    country("FINLAND", "5012"),
    country("FRANCE", "5013"),
    country("GERMANY", "5007"),
    country("GREECE", "5015"),
    country("HUNGARY", "5017"),
    country("ICELAND", "5019"),
    country("IRELAND", "5018"),
    country("ITALY", "5020"),
    country("LATVIA", "5024"),
    country("LIECHTENSTEIN", "5021"),
    country("LITHUANIA", "5022"),
    country("LUXEMBOURG", "5023"),
    country("MALTA", "5025"),
    country("NETHERLANDS", "5026"),
    country("NORWAY", "5027"),
    country("POLAND", "5028"),
    country("PORTUGAL", "5029"),
    country("ROMANIA", "5030"),
    country("SLOVAKIA", "5033"),
    country("SLOVENIA", "5032"),
    country("SPAIN", "5010"),
    country("SWEDEN", "5031"),
    country("SWITZERLAND", "5004"),
];

/// Whether `code` is `all` or one of the table's codes.
pub fn is_known_code(code: &str) -> bool {
    code == ALL || COUNTRIES.iter().any(|c| c.code == code)
}

/// The listing printed by `--list-countries`.
pub fn render_table() -> String {
    let mut out = String::from("RASFF Country Codes (Europe)\n\n");
    for c in COUNTRIES {
        out.push_str(&format!("{} {}\n", c.name, c.code));
    }
    out.push_str(
        "\nUsage: rasff --country CODE (or no code for all EU Single Market notifications)\n",
    );
    out
}
