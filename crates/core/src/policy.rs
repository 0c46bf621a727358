//! Permission sets for store creation and writes
//!
//! Both policies are pairs of independent capabilities. The combined
//! constants (`CREATE_OR_OPEN`, `ADD_OR_REPLACE`) permit either branch.
//! Callers test a capability with the `allows_*` accessors, never by
//! comparing whole values.

use std::ops::BitOr;

/// Whether `Store::create` may create a missing file, open an existing one, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenPolicy {
    allows_create: bool,
    allows_open: bool,
}

impl OpenPolicy {
    /// Only create a new file; fail if it already exists
    pub const CREATE: OpenPolicy = OpenPolicy {
        allows_create: true,
        allows_open: false,
    };

    /// Only open an existing file; fail if it is missing
    pub const OPEN: OpenPolicy = OpenPolicy {
        allows_create: false,
        allows_open: true,
    };

    /// Open the file if present, create it otherwise
    pub const CREATE_OR_OPEN: OpenPolicy = OpenPolicy {
        allows_create: true,
        allows_open: true,
    };

    /// Policy from explicit capabilities
    pub const fn new(allows_create: bool, allows_open: bool) -> Self {
        Self {
            allows_create,
            allows_open,
        }
    }

    /// A missing file may be created
    pub const fn allows_create(&self) -> bool {
        self.allows_create
    }

    /// An existing file may be opened
    pub const fn allows_open(&self) -> bool {
        self.allows_open
    }
}

impl BitOr for OpenPolicy {
    type Output = OpenPolicy;

    fn bitor(self, rhs: OpenPolicy) -> OpenPolicy {
        OpenPolicy::new(
            self.allows_create || rhs.allows_create,
            self.allows_open || rhs.allows_open,
        )
    }
}

/// Whether `set_value` may insert a new key, overwrite an existing one, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteMode {
    allows_add: bool,
    allows_replace: bool,
}

impl WriteMode {
    /// Insert only; an existing key is left untouched
    pub const ADD: WriteMode = WriteMode {
        allows_add: true,
        allows_replace: false,
    };

    /// Overwrite only; a missing key is not inserted
    pub const REPLACE: WriteMode = WriteMode {
        allows_add: false,
        allows_replace: true,
    };

    /// Upsert
    pub const ADD_OR_REPLACE: WriteMode = WriteMode {
        allows_add: true,
        allows_replace: true,
    };

    /// Mode from explicit capabilities
    pub const fn new(allows_add: bool, allows_replace: bool) -> Self {
        Self {
            allows_add,
            allows_replace,
        }
    }

    /// A missing key may be inserted
    pub const fn allows_add(&self) -> bool {
        self.allows_add
    }

    /// An existing key may be overwritten
    pub const fn allows_replace(&self) -> bool {
        self.allows_replace
    }
}

impl BitOr for WriteMode {
    type Output = WriteMode;

    fn bitor(self, rhs: WriteMode) -> WriteMode {
        WriteMode::new(
            self.allows_add || rhs.allows_add,
            self.allows_replace || rhs.allows_replace,
        )
    }
}
