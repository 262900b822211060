pub use self::codevalue::{CodeValue, CodeWidth};
pub use self::error::{Error, GeneratorError, ParserError, WidthError};
pub use self::generator::{classifier_name, Generator, GeneratorConfig, Language};
pub use self::parser::{Category, UnicodeData};
pub use self::predicate::{PartialPredicate, Predicate, PredicateBuilder, Pruner};

use tracing::{debug, warn};

use self::util::BitTrie;

pub mod codevalue;
pub mod error;
pub mod generator;
pub mod parser;
pub mod predicate;
pub mod util;

/// Result of compiling a set of code values into a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub predicate: Predicate,
    /// Compare/jumps emitted by the pruner.
    pub comparisons: usize,
    /// Trie nodes below the root before pruning.
    pub nodes: usize,
}

/// Compiles the matched code values into a minimal predicate.
///
/// Values outside of the domain of `width` are skipped with a warning.
pub fn compile<I>(values: I, width: CodeWidth) -> Compiled
where
    I: IntoIterator<Item = CodeValue>,
{
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();

    let in_domain = values.partition_point(|&value| width.contains(value));
    if in_domain < values.len() {
        warn!(
            skipped = values.len() - in_domain,
            %width,
            "code values outside of the domain are ignored"
        );
        values.truncate(in_domain);
    }

    let trie = BitTrie::from_sorted(width, values.iter().copied());
    let nodes = trie.len();
    debug!(values = values.len(), nodes, %width, "built match trie");

    let (predicate, comparisons) = Pruner::new(trie).run();
    Compiled {
        predicate,
        comparisons,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_unsorted() {
        let width = CodeWidth::new(4).unwrap();
        let compiled = compile([7, 5, 4, 6, 5], width);
        println!("{compiled:#?}");

        assert_eq!(compiled.predicate, Predicate::bit_test(0xc, 0x4, true));
        assert_eq!(compiled.comparisons, 1);
        assert_eq!(compiled.comparisons, compiled.predicate.comparisons());
    }

    #[test]
    fn compile_skips_out_of_domain() {
        let width = CodeWidth::new(4).unwrap();
        let compiled = compile([0x5, 0x15, 0xffff_ffff], width);
        assert_eq!(compiled.predicate, Predicate::bit_test(0xf, 0x5, true));
    }

    #[test]
    fn compile_constants() {
        let width = CodeWidth::new(3).unwrap();
        let compiled = compile([], width);
        assert_eq!(compiled.predicate, Predicate::Constant(false));
        assert_eq!(compiled.nodes, 0);

        let compiled = compile(0..8, width);
        assert_eq!(compiled.predicate, Predicate::Constant(true));
        assert_eq!(compiled.comparisons, 0);
    }

    #[test]
    fn compile_unicode_categories() {
        let data = UnicodeData::parse(
            "0030;DIGIT ZERO;Nd;\n\
             0031;DIGIT ONE;Nd;\n\
             0032;DIGIT TWO;Nd;\n\
             0033;DIGIT THREE;Nd;\n\
             0034;DIGIT FOUR;Nd;\n\
             0035;DIGIT FIVE;Nd;\n\
             0036;DIGIT SIX;Nd;\n\
             0037;DIGIT SEVEN;Nd;\n\
             0038;DIGIT EIGHT;Nd;\n\
             0039;DIGIT NINE;Nd;\n\
             0041;LATIN CAPITAL LETTER A;Lu;\n",
        )
        .unwrap();

        let values = data.filter("Nd");
        let compiled = compile(values.iter().copied(), CodeWidth::default());
        println!("{}", compiled.predicate);

        for c in 0..0x100 {
            assert_eq!(compiled.predicate.evaluate(c), (0x30..=0x39).contains(&c));
        }
        assert!(!compiled.predicate.evaluate(0x1_0030));
        assert!(!compiled.predicate.evaluate(0xffff_ff30));
    }
}
