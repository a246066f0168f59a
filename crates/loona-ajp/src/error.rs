/// Fatal protocol errors. Any of these means the peer isn't speaking AJP13
/// the way we expect: the connection must be torn down and the partially
/// decoded request thrown away.
///
/// Running out of input is not an error, see [crate::Progress::Suspended].
#[derive(PartialEq, Eq, Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AjpError {
    /// The first two bytes of the packet were not `0x1234`
    #[error("Wrong magic number: expected 0x1234, got {found:#06x}")]
    BadMagic { found: u16 },

    /// The method byte isn't in the method table
    #[error("Unknown method code {0}")]
    UnknownMethod(u8),

    /// The attribute tag isn't in the attribute table, and isn't the
    /// custom-name tag or the terminator either
    #[error("Unknown attribute code {0:#04x}")]
    UnknownAttribute(u8),

    /// A compressed header name (`0xA0xx`) pointed outside the header table
    #[error("Unknown compressed header code {0:#04x}")]
    UnknownHeaderCode(u8),
}
