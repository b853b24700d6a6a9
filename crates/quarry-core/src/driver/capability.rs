/// What a backend supports beyond the common SQL subset.
#[derive(Debug)]
pub struct Capability {
    /// `INSERT .. RETURNING` for backend-generated keys
    pub returning: bool,

    /// Row-level locking through `SELECT .. FOR UPDATE`
    pub select_for_update: bool,

    /// Largest number of bound parameters per statement
    pub max_params: usize,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        returning: true,
        select_for_update: false,
        max_params: 32_766,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        select_for_update: true,
        max_params: 65_535,
        ..Self::SQLITE
    };

    /// HANA capabilities
    pub const HANA: Self = Self {
        returning: false,
        select_for_update: true,
        max_params: 32_767,
    };
}
