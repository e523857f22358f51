use crate::{MAX_KEY_SIZE, MdbxError};
use durable_kv::model::{Db, DbConfig, DuplicateConfig, PutPrecondition, SortOrder};
use parking_lot::RwLock;
use signet_libmdbx::{DatabaseFlags, WriteFlags};
use std::{collections::HashMap, sync::Arc};

/// Names of the databases opened through an environment, by dbi.
///
/// Transactions reopen a handle by name, so a [`Db`] from one transaction
/// stays usable in the next.
pub type DbNames = Arc<RwLock<HashMap<u32, Option<String>>>>;

/// The MDBX flags a database with `config` is created with.
pub const fn flags_of(config: DbConfig) -> DatabaseFlags {
    let mut flags = match config.key_order {
        SortOrder::Standard => DatabaseFlags::empty(),
        SortOrder::Reverse => DatabaseFlags::REVERSE_KEY,
        SortOrder::Integer => DatabaseFlags::INTEGER_KEY,
    };
    if let Some(dup) = config.duplicates {
        flags = flags.union(DatabaseFlags::DUP_SORT);
        if dup.fixed_size || dup.order.is_integer() {
            flags = flags.union(DatabaseFlags::DUP_FIXED);
        }
        flags = match dup.order {
            SortOrder::Standard => flags,
            SortOrder::Reverse => flags.union(DatabaseFlags::REVERSE_DUP),
            SortOrder::Integer => flags.union(DatabaseFlags::INTEGER_DUP),
        };
    }
    flags
}

/// The configuration an existing database was created with.
pub const fn config_of(flags: DatabaseFlags) -> DbConfig {
    let key_order = if flags.contains(DatabaseFlags::INTEGER_KEY) {
        SortOrder::Integer
    } else if flags.contains(DatabaseFlags::REVERSE_KEY) {
        SortOrder::Reverse
    } else {
        SortOrder::Standard
    };
    let config = DbConfig::new().with_key_order(key_order);
    if !flags.contains(DatabaseFlags::DUP_SORT) {
        return config;
    }

    let order = if flags.contains(DatabaseFlags::INTEGER_DUP) {
        SortOrder::Integer
    } else if flags.contains(DatabaseFlags::REVERSE_DUP) {
        SortOrder::Reverse
    } else {
        SortOrder::Standard
    };
    let duplicates = DuplicateConfig::new(order);
    let duplicates =
        if flags.contains(DatabaseFlags::DUP_FIXED) { duplicates.fixed() } else { duplicates };
    config.with_duplicates(duplicates)
}

/// True if a database created with `existing` flags may be reopened as
/// `config`.
pub(crate) fn compatible(existing: DatabaseFlags, config: DbConfig) -> bool {
    existing.difference(DatabaseFlags::CREATE) == flags_of(config)
}

/// The write flags of a put with `precondition`.
pub(crate) const fn write_flags(db: Db, precondition: Option<PutPrecondition>) -> WriteFlags {
    match (precondition, db.config().is_dupsort()) {
        (None, _) => WriteFlags::UPSERT,
        (Some(PutPrecondition::UniqueKeyValue), true) => WriteFlags::NO_DUP_DATA,
        (Some(_), _) => WriteFlags::NO_OVERWRITE,
    }
}

/// Refuse keys and values the engine would reject, before they reach it.
pub(crate) fn check_pair(db: Db, key: &[u8], value: &[u8]) -> Result<(), MdbxError> {
    check_key(db, key)?;
    let Some(dup) = db.config().duplicates else {
        return Ok(());
    };
    let size = value.len();
    if size > MAX_KEY_SIZE || (dup.order.is_integer() && !matches!(size, 4 | 8)) {
        return Err(MdbxError::BadValueSize { size });
    }
    Ok(())
}

pub(crate) fn check_key(db: Db, key: &[u8]) -> Result<(), MdbxError> {
    let size = key.len();
    let bad_integer = db.config().key_order.is_integer() && !matches!(size, 4 | 8);
    if size == 0 || size > MAX_KEY_SIZE || bad_integer {
        return Err(MdbxError::BadValueSize { size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_round_trip_every_order() {
        let orders = [SortOrder::Standard, SortOrder::Reverse];
        for key_order in [SortOrder::Standard, SortOrder::Reverse, SortOrder::Integer] {
            let plain = DbConfig::new().with_key_order(key_order);
            assert_eq!(config_of(flags_of(plain)), plain);
            for order in orders {
                for duplicates in [DuplicateConfig::new(order), DuplicateConfig::new(order).fixed()]
                {
                    let config = plain.with_duplicates(duplicates);
                    assert_eq!(config_of(flags_of(config)), config);
                }
            }
        }
    }

    #[test]
    fn integer_duplicates_are_always_fixed() {
        let loose = DbConfig::new().with_duplicates(DuplicateConfig::new(SortOrder::Integer));
        let fixed =
            DbConfig::new().with_duplicates(DuplicateConfig::new(SortOrder::Integer).fixed());
        assert_eq!(flags_of(loose), flags_of(fixed));
        assert_eq!(config_of(flags_of(loose)), fixed);
        assert!(compatible(flags_of(fixed), loose));
        assert!(!compatible(flags_of(loose), DbConfig::new()));
        assert!(compatible(DatabaseFlags::CREATE, DbConfig::new()));
    }

    #[test]
    fn preconditions_pick_write_flags() {
        let plain = Db::new(2, DbConfig::new());
        let dups = Db::new(3, DbConfig::new().with_duplicates(DuplicateConfig::default()));

        assert_eq!(write_flags(plain, None), WriteFlags::UPSERT);
        assert_eq!(write_flags(plain, Some(PutPrecondition::UniqueKey)), WriteFlags::NO_OVERWRITE);
        assert_eq!(
            write_flags(plain, Some(PutPrecondition::UniqueKeyValue)),
            WriteFlags::NO_OVERWRITE
        );
        assert_eq!(write_flags(dups, Some(PutPrecondition::UniqueKey)), WriteFlags::NO_OVERWRITE);
        assert_eq!(
            write_flags(dups, Some(PutPrecondition::UniqueKeyValue)),
            WriteFlags::NO_DUP_DATA
        );
    }

    #[test]
    fn sizes_are_checked_before_the_engine() {
        let integers = Db::new(2, DbConfig::new().with_key_order(SortOrder::Integer));
        assert!(check_pair(integers, &[0; 4], b"").is_ok());
        assert!(matches!(
            check_pair(integers, &[0; 3], b""),
            Err(MdbxError::BadValueSize { size: 3 })
        ));

        let dups = Db::new(3, DbConfig::new().with_duplicates(DuplicateConfig::default()));
        assert!(matches!(check_key(dups, b""), Err(MdbxError::BadValueSize { size: 0 })));
        let long = vec![0u8; MAX_KEY_SIZE + 1];
        assert!(check_pair(dups, b"k", &long).is_err());
        assert!(check_pair(Db::new(4, DbConfig::new()), b"k", &long).is_ok());
    }
}
