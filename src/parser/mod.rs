use std::path::Path;

use pest::iterators::Pair;
use pest::Parser;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};
use tracing::{debug, warn};

pub use self::grammar::Rule;
use self::grammar::Grammar;
use crate::codevalue::CodeValue;
use crate::error::ParserError;
use crate::util::FastHashMap;

mod grammar;

/// Interned general category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Category(DefaultSymbol);

/// Code values of `UnicodeData.txt` grouped by general category.
#[derive(Default)]
pub struct UnicodeData {
    interner: StringInterner<DefaultBackend>,
    values: FastHashMap<Category, Vec<CodeValue>>,
    len: usize,
}

impl UnicodeData {
    /// Reads a data file, failing if it yields no code values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParserError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ParserError::Read {
            path: path.to_owned(),
            source,
        })?;

        let data = Self::parse(&input)?;
        if data.is_empty() {
            return Err(ParserError::NoCodeValues(path.to_owned()));
        }
        debug!(
            path = %path.display(),
            values = data.len,
            categories = data.values.len(),
            "loaded unicode data"
        );
        Ok(data)
    }

    pub fn parse(input: &str) -> Result<Self, ParserError> {
        let pairs =
            Grammar::parse(Rule::file, input).map_err(|e| ParserError::InvalidInput(Box::new(e)))?;

        let mut data = Self::default();
        let mut open_range = None;
        for pair in pairs {
            match pair.as_rule() {
                Rule::line => {}
                Rule::bad_line => {
                    let (line, _) = pair.line_col();
                    warn!(line, text = pair.as_str(), "skipping malformed line");
                    continue;
                }
                Rule::EOI => break,
                rule => return Err(ParserError::UnexpectedRule(rule)),
            }

            let entry = parse_line(pair)?;
            if let Some((first, category)) = open_range.take() {
                if !entry.name.ends_with("Last>") {
                    warn!(first, name = entry.name, "range closed by an unexpected line");
                }
                if entry.code < first {
                    return Err(ParserError::EmptyRange {
                        first,
                        last: entry.code,
                    });
                }
                data.add_range(first..=entry.code, category);
                continue;
            }

            let category = data.intern_category(entry.category);
            if entry.name.ends_with("First>") {
                open_range = Some((entry.code, category));
            } else {
                data.add_range(entry.code..=entry.code, category);
            }
        }

        if let Some((first, _)) = open_range {
            return Err(ParserError::UnclosedRange(first));
        }

        Ok(data)
    }

    /// Total number of code values read.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get_category<T: AsRef<str>>(&self, name: T) -> Option<Category> {
        self.interner.get(name).map(Category)
    }

    pub fn resolve_category(&self, category: Category) -> Option<&str> {
        self.interner.resolve(category.0)
    }

    /// Category names in lexicographic order.
    pub fn categories(&self) -> Vec<&str> {
        let mut names = self
            .values
            .keys()
            .filter_map(|&category| self.resolve_category(category))
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Code values of a single category, in file order.
    pub fn values(&self, category: Category) -> &[CodeValue] {
        self.values.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Sorted, duplicate-free union of a comma-separated list of categories.
    ///
    /// Unknown categories are reported and skipped.
    pub fn filter(&self, categories: &str) -> Vec<CodeValue> {
        let mut result = Vec::new();
        for name in categories.split(',').map(str::trim) {
            match self.get_category(name) {
                Some(category) => result.extend_from_slice(self.values(category)),
                None => warn!(category = name, "general category is undefined, ignoring"),
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    fn intern_category(&mut self, name: &str) -> Category {
        Category(self.interner.get_or_intern(name))
    }

    fn add_range(&mut self, range: std::ops::RangeInclusive<CodeValue>, category: Category) {
        let values = self.values.entry(category).or_default();
        let before = values.len();
        values.extend(range);
        self.len += values.len() - before;
    }
}

struct Entry<'a> {
    code: CodeValue,
    name: &'a str,
    category: &'a str,
}

fn parse_line(pair: Pair<'_, Rule>) -> Result<Entry<'_>, ParserError> {
    let mut pairs = pair.into_inner();
    let mut next = |rule| {
        let pair = pairs.next().ok_or(ParserError::UnexpectedEol)?;
        ensure_rule(&pair, rule)?;
        Ok::<_, ParserError>(pair.as_str())
    };

    let code = CodeValue::from_str_radix(next(Rule::code)?, 16)
        .map_err(ParserError::InvalidCodeValue)?;
    let name = next(Rule::name)?.trim();
    let category = next(Rule::category)?;

    Ok(Entry {
        code,
        name,
        category,
    })
}

fn ensure_rule(pair: &Pair<'_, Rule>, rule: Rule) -> Result<(), ParserError> {
    let pair_rule = pair.as_rule();
    if pair_rule == rule {
        Ok(())
    } else {
        Err(ParserError::UnexpectedRule(pair_rule))
    }
}
