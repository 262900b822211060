pub use self::bin_trie::*;

mod bin_trie;

pub type FastHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
