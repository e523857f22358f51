use core::cmp::Ordering;

/// How an engine orders the keys (or duplicate values) of a database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Lexicographic byte order. Shorter prefixes sort first.
    #[default]
    Standard,
    /// Lexicographic byte order, comparing from the last byte backwards.
    Reverse,
    /// Native-endian unsigned integers of 4 or 8 bytes, compared
    /// numerically.
    Integer,
}

impl SortOrder {
    /// Compare two encoded keys or values under this order.
    ///
    /// [`SortOrder::Integer`] compares inputs of unequal or unsupported
    /// width by length first, then bytewise, so the order stays total.
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            Self::Standard => a.cmp(b),
            Self::Reverse => a.iter().rev().cmp(b.iter().rev()),
            Self::Integer => match (a.len(), b.len()) {
                (4, 4) => read_u32(a).cmp(&read_u32(b)),
                (8, 8) => read_u64(a).cmp(&read_u64(b)),
                (x, y) => x.cmp(&y).then_with(|| a.cmp(b)),
            },
        }
    }

    /// True if this order only admits 4- or 8-byte integers.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Integer)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_ne_bytes(raw)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_ne_bytes(raw)
}

/// Duplicate-value configuration of a database (`DUPSORT` in LMDB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DuplicateConfig {
    /// Order of the values stored under one key.
    pub order: SortOrder,
    /// All values have the same size (`DUPFIXED` in LMDB).
    pub fixed_size: bool,
}

impl DuplicateConfig {
    /// Sorted duplicates of any size.
    pub const fn new(order: SortOrder) -> Self {
        Self { order, fixed_size: false }
    }

    /// Require every value to have the same size.
    pub const fn fixed(mut self) -> Self {
        self.fixed_size = true;
        self
    }
}

/// Configuration a database is created with.
///
/// Reopening an existing database with a different configuration is an
/// error in every engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DbConfig {
    /// Order of the keys.
    pub key_order: SortOrder,
    /// Duplicate values, if enabled.
    pub duplicates: Option<DuplicateConfig>,
}

impl DbConfig {
    /// Standard key order, one value per key.
    pub const fn new() -> Self {
        Self { key_order: SortOrder::Standard, duplicates: None }
    }

    /// Set the key order.
    pub const fn with_key_order(mut self, key_order: SortOrder) -> Self {
        self.key_order = key_order;
        self
    }

    /// Allow duplicate values under one key.
    pub const fn with_duplicates(mut self, duplicates: DuplicateConfig) -> Self {
        self.duplicates = Some(duplicates);
        self
    }

    /// True if the database stores sorted duplicates.
    pub const fn is_dupsort(&self) -> bool {
        self.duplicates.is_some()
    }

    /// The order of duplicate values. Standard if duplicates are disabled.
    pub const fn value_order(&self) -> SortOrder {
        match self.duplicates {
            Some(dup) => dup.order,
            None => SortOrder::Standard,
        }
    }
}

/// Handle to an open database inside an environment.
///
/// Handles are plain data. They stay valid across transactions until the
/// database is dropped with `close = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Db {
    id: u32,
    config: DbConfig,
}

impl Db {
    /// Create a handle. Only engines should need this.
    pub const fn new(id: u32, config: DbConfig) -> Self {
        Self { id, config }
    }

    /// The engine's identifier of the database.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The configuration the database was opened with.
    pub const fn config(&self) -> DbConfig {
        self.config
    }
}

/// Insert-only conditions for a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutPrecondition {
    /// Fail if the key is present at all (`NOOVERWRITE`).
    UniqueKey,
    /// Fail if this exact key-value pair is present (`NODUPDATA`). Only
    /// meaningful for duplicate databases.
    UniqueKeyValue,
}

/// Statistics of one database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Size of a page in bytes.
    pub page_size: u32,
    /// Depth of the B-tree.
    pub depth: u32,
    /// Number of internal pages.
    pub branch_pages: usize,
    /// Number of leaf pages.
    pub leaf_pages: usize,
    /// Number of overflow pages.
    pub overflow_pages: usize,
    /// Number of key-value pairs, counting every duplicate.
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_lexicographic() {
        assert_eq!(SortOrder::Standard.compare(b"cat", b"crow"), Ordering::Less);
        assert_eq!(SortOrder::Standard.compare(b"ab", b"a"), Ordering::Greater);
    }

    #[test]
    fn reverse_compares_from_the_end() {
        assert_eq!(SortOrder::Reverse.compare(b"za", b"ab"), Ordering::Less);
        assert_eq!(SortOrder::Reverse.compare(b"ba", b"a"), Ordering::Greater);
    }

    #[test]
    fn integer_is_numeric() {
        let one = 1u32.to_ne_bytes();
        let big = 256u32.to_ne_bytes();
        assert_eq!(SortOrder::Integer.compare(&one, &big), Ordering::Less);

        let wide = u64::MAX.to_ne_bytes();
        let narrow = 2u64.to_ne_bytes();
        assert_eq!(SortOrder::Integer.compare(&wide, &narrow), Ordering::Greater);
    }

    #[test]
    fn dupsort_config() {
        let config = DbConfig::new().with_duplicates(DuplicateConfig::new(SortOrder::Reverse));
        assert!(config.is_dupsort());
        assert_eq!(config.value_order(), SortOrder::Reverse);
        assert!(!DbConfig::new().is_dupsort());
    }
}
