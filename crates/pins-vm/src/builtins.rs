//! Runtime services reachable at fixed negative addresses.

/// A runtime service. `CALL` to its address runs it instead of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `exit(code)`: halt with `code`.
    Exit,
    /// `getint()`: read one integer.
    Getint,
    /// `putint(n)`: write `n` in decimal.
    Putint,
    /// `getstr(addr)`: read one line into memory at `addr`.
    Getstr,
    /// `putstr(addr)`: write the zero-terminated string at `addr`.
    Putstr,
    /// `new(size)`: allocate `size` bytes on the heap.
    New,
    /// `del(addr)`: release heap memory (never reused).
    Del,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Exit,
        Builtin::Getint,
        Builtin::Putint,
        Builtin::Getstr,
        Builtin::Putstr,
        Builtin::New,
        Builtin::Del,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Getint => "getint",
            Builtin::Putint => "putint",
            Builtin::Getstr => "getstr",
            Builtin::Putstr => "putstr",
            Builtin::New => "new",
            Builtin::Del => "del",
        }
    }

    /// The fixed address: -1 for `exit` through -7 for `del`.
    pub fn address(self) -> i32 {
        match self {
            Builtin::Exit => -1,
            Builtin::Getint => -2,
            Builtin::Putint => -3,
            Builtin::Getstr => -4,
            Builtin::Putstr => -5,
            Builtin::New => -6,
            Builtin::Del => -7,
        }
    }

    pub fn from_address(address: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.address() == address)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}
