use std::fmt::{self, Display, Formatter};

use num_bigint::BigInt;

/// The values collected from the command line. Nothing is validated until the record is checked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub integer: Option<BigInt>,
    pub float: Option<f64>,
    pub bool1: bool,
    pub bool2: bool,
    pub list: Option<Vec<String>>,
}

/// One parsed subcommand: the field it sets and the value it sets it to.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    Integer(BigInt),
    Float(f64),
    Bool1(bool),
    Bool2(bool),
    List(Vec<String>),
}

impl Record {
    pub fn apply(&mut self, update: &Update) {
        match update {
            Update::Integer(value) => self.integer = Some(value.clone()),
            Update::Float(value) => self.float = Some(*value),
            Update::Bool1(value) => self.bool1 = *value,
            Update::Bool2(value) => self.bool2 = *value,
            Update::List(values) => self.list = Some(values.clone()),
        }
    }

    pub fn from_updates<'a>(updates: impl IntoIterator<Item = &'a Update>) -> Self {
        let mut record = Record::default();
        for update in updates {
            record.apply(update);
        }
        record
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Update::Integer(value) => write!(f, "Integer: {}", value),
            Update::Float(value) => write!(f, "Float: {:?}", value),
            Update::Bool1(value) => write!(f, "Boolean 1: {}", value),
            Update::Bool2(value) => write!(f, "Boolean 2: {}", value),
            Update::List(values) => write!(f, "List: {:?}", values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_updates_win() {
        let record = Record::from_updates(&[
            Update::Integer(3.into()),
            Update::Bool1(true),
            Update::Integer(12.into()),
            Update::Bool1(false),
            Update::List(vec!["a".into()]),
        ]);
        assert_eq!(
            record,
            Record {
                integer: Some(12.into()),
                float: None,
                bool1: false,
                bool2: false,
                list: Some(vec!["a".to_string()]),
            }
        );
    }

    #[test]
    fn status_lines() {
        assert_eq!(Update::Integer((-4).into()).to_string(), "Integer: -4");
        assert_eq!(Update::Float(2.0).to_string(), "Float: 2.0");
        assert_eq!(Update::Float(2.3).to_string(), "Float: 2.3");
        assert_eq!(Update::Bool2(true).to_string(), "Boolean 2: true");
        assert_eq!(
            Update::List(vec!["x".into(), "y z".into()]).to_string(),
            r#"List: ["x", "y z"]"#
        );
    }
}
