// ── Metric-definition (UDR) mapping ──
//
// Line format: `app_id,type_tag,column_name,display_name`. The display
// name is the remainder of the line and may contain commas. Lines with
// too few fields or a non-numeric app id are skipped.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UdrType {
    Int,
    String,
    BigInt,
}

impl UdrType {
    /// `STR*` and `INET_*` hold strings, `INT64_*` 64-bit integers,
    /// everything else plain integers.
    pub fn from_tag(tag: &str) -> Self {
        if tag.starts_with("INT64_") {
            Self::BigInt
        } else if tag.starts_with("STR") || tag.starts_with("INET_") {
            Self::String
        } else {
            Self::Int
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Udr {
    pub kind: UdrType,
    pub column_name: String,
    pub display_name: String,
}

#[derive(Debug, Default)]
pub struct UdrMapper {
    entries: BTreeMap<(i32, String), Udr>,
}

impl UdrMapper {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| CoreError::io(path, e))?;
        let mapper = Self::from_reader(BufReader::new(file)).map_err(|e| CoreError::io(path, e))?;
        debug!(path = %path.display(), entries = mapper.len(), "metric definitions loaded");
        Ok(mapper)
    }

    pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
        let mut mapper = Self::default();
        for line in reader.lines() {
            let line = line?;
            if let Some((app, tag, udr)) = parse_line(&line) {
                mapper.entries.insert((app, tag), udr);
            }
        }
        Ok(mapper)
    }

    pub fn get(&self, app: i32, tag: &str) -> Option<&Udr> {
        self.entries.get(&(app, tag.to_owned()))
    }

    /// All definitions for one application, ordered by tag.
    pub fn for_app(&self, app: i32) -> impl Iterator<Item = (&str, &Udr)> {
        self.entries
            .iter()
            .filter(move |((a, _), _)| *a == app)
            .map(|((_, tag), udr)| (tag.as_str(), udr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Option<(i32, String, Udr)> {
    let fields: Vec<&str> = line.splitn(4, ',').collect();
    let [app, tag, column, display] = fields.as_slice() else {
        return None;
    };
    let app = app.trim().parse::<i32>().ok()?;
    Some((
        app,
        (*tag).to_owned(),
        Udr {
            kind: UdrType::from_tag(tag),
            column_name: (*column).to_owned(),
            display_name: (*display).to_owned(),
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_well_formed_lines() {
        let input = "12,STR_APP,col1,DisplayApp\n";
        let mapper = UdrMapper::from_reader(input.as_bytes()).unwrap();
        assert_eq!(
            mapper.get(12, "STR_APP").unwrap(),
            &Udr {
                kind: UdrType::String,
                column_name: "col1".into(),
                display_name: "DisplayApp".into(),
            }
        );
    }

    #[test]
    fn skips_malformed_lines_without_aborting() {
        let input = "\
1,INT00,c1,Bytes
2,INT64_00,c2
x,STR00,c3,Nope
3,INT64_00,c4,Big
4,INET_00,c5,Addr, with comma
";
        let mapper = UdrMapper::from_reader(input.as_bytes()).unwrap();
        assert_eq!(mapper.len(), 3);
        assert_eq!(mapper.get(1, "INT00").unwrap().kind, UdrType::Int);
        assert_eq!(mapper.get(3, "INT64_00").unwrap().kind, UdrType::BigInt);
        let addr = mapper.get(4, "INET_00").unwrap();
        assert_eq!(addr.kind, UdrType::String);
        assert_eq!(addr.display_name, "Addr, with comma");
        assert!(mapper.get(2, "INT64_00").is_none());
    }

    #[test]
    fn groups_by_application() {
        let input = "5,STR01,a,A\n5,INT01,b,B\n6,INT01,c,C\n";
        let mapper = UdrMapper::from_reader(input.as_bytes()).unwrap();
        let tags: Vec<_> = mapper.for_app(5).map(|(tag, _)| tag).collect();
        assert_eq!(tags, ["INT01", "STR01"]);
    }
}
