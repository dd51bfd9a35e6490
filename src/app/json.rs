use crate::{BenchError, Result};
use serde::Serialize;
use std::any::{TypeId, type_name};
use std::io;

/// Body of the `/json` route
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HelloMessage {
    pub message: &'static str,
}

pub const HELLO_MESSAGE: HelloMessage = HelloMessage {
    message: "Hello, World!",
};

#[derive(Debug)]
struct Contract {
    type_id: TypeId,
    type_name: &'static str,
    encoded_len: usize,
}

/// Registry of the shapes the server is allowed to serialize
///
/// Each shape is encoded once at registration to learn its exact length, which
/// becomes the `Content-Length` written ahead of the body. Serializing a type
/// that was never registered is a programming error and fails the request.
#[derive(Debug, Default)]
pub struct JsonContracts {
    contracts: Vec<Contract>,
}

impl JsonContracts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, returning the encoded length of `sample`
    pub fn register<T>(&mut self, sample: &T) -> Result<usize>
    where
        T: Serialize + 'static,
    {
        let encoded_len = serde_json::to_vec(sample)?.len();
        let contract = Contract {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            encoded_len,
        };

        match self.contracts.iter_mut().find(|c| c.type_id == contract.type_id) {
            Some(existing) => *existing = contract,
            None => self.contracts.push(contract),
        }
        Ok(encoded_len)
    }

    /// The encoded length every value of `T` must have
    pub fn content_length<T: 'static>(&self) -> Result<usize> {
        self.contract::<T>().map(|c| c.encoded_len)
    }

    /// Streams `value` into `writer` through its registered contract
    pub fn serialize<T, W>(&self, value: &T, writer: W) -> Result<()>
    where
        T: Serialize + 'static,
        W: io::Write,
    {
        let contract = self.contract::<T>()?;

        let mut counting = CountingWriter { inner: writer, written: 0 };
        serde_json::to_writer(&mut counting, value)?;

        if counting.written != contract.encoded_len {
            return Err(BenchError::ContractMismatch {
                type_name: contract.type_name,
                expected: contract.encoded_len,
                actual: counting.written,
            });
        }
        Ok(())
    }

    fn contract<T: 'static>(&self) -> Result<&Contract> {
        let type_id = TypeId::of::<T>();
        self.contracts
            .iter()
            .find(|c| c.type_id == type_id)
            .ok_or(BenchError::UnregisteredType(type_name::<T>()))
    }
}

struct CountingWriter<W> {
    inner: W,
    written: usize,
}

impl<W: io::Write> io::Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
