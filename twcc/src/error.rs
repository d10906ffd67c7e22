use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Packet contains an invalid header.
    #[error("Invalid header")]
    InvalidHeader,
    /// Packet received is too short.
    #[error("Packet too short")]
    PacketTooShort,
    /// Buffer is too short.
    #[error("Buffer too short to be written")]
    BufferTooShort,
    /// Wrong packet type.
    #[error("Wrong packet type")]
    WrongType,
    /// Invalid packet version.
    #[error("Invalid packet version")]
    BadVersion,
    /// Invalid size or start index.
    #[error("Invalid size or startIndex")]
    InvalidSizeOrStartIndex,
    /// Delta exceeds limit.
    #[error("Delta exceed limit")]
    DeltaExceedLimit,
    /// Packet status chunk is not 2 bytes.
    #[error("Packet status chunk must be 2 bytes")]
    PacketStatusChunkLength,
    #[error("Wrong chunk type")]
    WrongChunkType,
    #[error("Run length exceed limit")]
    RunLengthExceedLimit,
    #[error("Symbol cannot be encoded with this symbol size")]
    SymbolOutOfRange,
}

impl From<Error> for util::Error {
    fn from(e: Error) -> Self {
        util::Error::from_std(e)
    }
}

impl PartialEq<util::Error> for Error {
    fn eq(&self, other: &util::Error) -> bool {
        if let Some(down) = other.downcast_ref::<Error>() {
            return self == down;
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_through_util() {
        let e = util::Error::from(Error::WrongType);
        assert_eq!(Error::WrongType, e);
        assert_ne!(Error::PacketTooShort, e);
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::WrongType));
        assert_eq!(e.to_string(), "Wrong packet type");

        assert_ne!(Error::WrongType, util::Error::ErrBufferShort);
    }
}
