//! Deterministic PRNG over host-supplied randomness blocks.
//!
//! Seeding never consumes host entropy: it only resets the domain-separation
//! prefix, counter, and buffer. Blocks are fetched lazily under the domain
//! `b"random" + seed_prefix + counter_le8`, so distinct seeds and draws never
//! reuse an entropy domain. Every derived operation is built strictly on the
//! internal byte source; none makes an independent host call.
//!
//! State is plain data. A contract that needs PRNG continuity across a
//! checkpoint persists [`RngState`] itself (e.g. inside a continuation
//! `Capture`); this module performs no automatic persistence.

use crate::error::{Result, SdkError};
use crate::value::{Capture, Value};
use pvm_host::HostApi;
use serde::{Deserialize, Serialize};

/// Domain tag prepended to every block request.
pub const RANDOM_DOMAIN_TAG: &[u8] = b"random";

pub const RNG_STATE_VERSION: u32 = 1;

/// Caller-supplied seed, coerced to a tagged domain-separation prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    None,
    Bytes(Vec<u8>),
    Str(String),
    Int(i64),
}

impl Seed {
    /// Tag byte `N`/`B`/`S`/`I` followed by the type-specific encoding.
    fn coerce(&self) -> Vec<u8> {
        match self {
            Seed::None => b"N".to_vec(),
            Seed::Bytes(bytes) => {
                let mut out = Vec::with_capacity(1 + bytes.len());
                out.push(b'B');
                out.extend_from_slice(bytes);
                out
            }
            Seed::Str(s) => {
                let mut out = Vec::with_capacity(1 + s.len());
                out.push(b'S');
                out.extend_from_slice(s.as_bytes());
                out
            }
            Seed::Int(n) => {
                let mut out = Vec::with_capacity(9);
                out.push(b'I');
                out.extend_from_slice(&n.to_le_bytes());
                out
            }
        }
    }
}

/// Exported PRNG state: the flat, versioned record a contract persists if
/// randomness must survive a checkpoint boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub version: u32,
    pub seed_prefix: Vec<u8>,
    pub counter: u64,
    pub buffer: Vec<u8>,
    pub buffer_pos: usize,
}

impl RngState {
    /// JSON-safe shape for embedding in a continuation `Capture`.
    pub fn to_value(&self) -> Value {
        Value::from(
            Capture::new()
                .with("version", self.version as i64)
                .with("seed_prefix", Value::bytes(self.seed_prefix.clone()))
                .with("counter", self.counter as i64)
                .with("buffer", Value::bytes(self.buffer.clone()))
                .with("buffer_pos", self.buffer_pos as i64),
        )
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_map()
            .ok_or(SdkError::RngState("state must be a map"))?;
        let int_field = |name: &'static str, err: &'static str| -> Result<i64> {
            map.get(name)
                .and_then(Value::as_int)
                .ok_or(SdkError::RngState(err))
        };
        let bytes_field = |name: &'static str, err: &'static str| -> Result<Vec<u8>> {
            map.get(name)
                .and_then(Value::as_bytes)
                .map(<[u8]>::to_vec)
                .ok_or(SdkError::RngState(err))
        };
        let version = int_field("version", "bad 'version'")?;
        let counter = int_field("counter", "bad 'counter'")?;
        let buffer_pos = int_field("buffer_pos", "bad 'buffer_pos'")?;
        if version < 0 || counter < 0 || buffer_pos < 0 {
            return Err(SdkError::RngState("negative field"));
        }
        Ok(Self {
            version: version as u32,
            seed_prefix: bytes_field("seed_prefix", "bad 'seed_prefix'")?,
            counter: counter as u64,
            buffer: bytes_field("buffer", "bad 'buffer'")?,
            buffer_pos: buffer_pos as usize,
        })
    }
}

/// Seedable, fully reproducible random source. All draws are a deterministic
/// function of `(seed, sequence of host blocks)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvmRng {
    seed_prefix: Vec<u8>,
    counter: u64,
    buffer: Vec<u8>,
    buffer_pos: usize,
}

impl Default for PvmRng {
    fn default() -> Self {
        Self::new()
    }
}

impl PvmRng {
    /// Equivalent to seeding with [`Seed::None`].
    pub fn new() -> Self {
        Self {
            seed_prefix: b"N".to_vec(),
            counter: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
        }
    }

    pub fn seeded(seed: &Seed) -> Self {
        let mut rng = Self::new();
        rng.seed(seed);
        rng
    }

    /// Reset to a fresh stream for `seed`. Consumes no host entropy.
    pub fn seed(&mut self, seed: &Seed) {
        self.seed_prefix = seed.coerce();
        self.counter = 0;
        self.buffer.clear();
        self.buffer_pos = 0;
    }

    fn next_block(&mut self, host: &mut dyn HostApi) -> Result<()> {
        let mut domain =
            Vec::with_capacity(RANDOM_DOMAIN_TAG.len() + self.seed_prefix.len() + 8);
        domain.extend_from_slice(RANDOM_DOMAIN_TAG);
        domain.extend_from_slice(&self.seed_prefix);
        domain.extend_from_slice(&self.counter.to_le_bytes());
        let block = host.randomness(&domain)?;
        self.counter += 1;
        self.buffer.extend_from_slice(&block);
        Ok(())
    }

    /// `n` fresh bytes. Grows the buffer (compacting the consumed prefix
    /// first) until it holds enough unread bytes, then advances the cursor.
    pub fn randbytes(&mut self, host: &mut dyn HostApi, n: usize) -> Result<Vec<u8>> {
        if self.buffer.len() - self.buffer_pos < n {
            if self.buffer_pos > 0 {
                self.buffer.drain(..self.buffer_pos);
                self.buffer_pos = 0;
            }
            while self.buffer.len() < n {
                self.next_block(host)?;
            }
        }
        let start = self.buffer_pos;
        self.buffer_pos += n;
        Ok(self.buffer[start..self.buffer_pos].to_vec())
    }

    /// A uniform `k`-bit integer, `k <= 64`.
    pub fn getrandbits(&mut self, host: &mut dyn HostApi, k: u32) -> Result<u64> {
        if k == 0 {
            return Ok(0);
        }
        if k > 64 {
            return Err(SdkError::Random("getrandbits width exceeds 64"));
        }
        let nbytes = k.div_ceil(8) as usize;
        let bytes = self.randbytes(host, nbytes)?;
        let mut acc: u64 = 0;
        for byte in bytes {
            acc = (acc << 8) | u64::from(byte);
        }
        Ok(acc >> (nbytes as u32 * 8 - k))
    }

    /// Uniform float in `[0, 1)` with a 53-bit mantissa.
    pub fn random(&mut self, host: &mut dyn HostApi) -> Result<f64> {
        Ok(self.getrandbits(host, 53)? as f64 / (1u64 << 53) as f64)
    }

    // Rejection sampling: draw bit_length(n)-bit candidates until one lands
    // below n. Unbounded but terminates with probability 1.
    fn randbelow(&mut self, host: &mut dyn HostApi, n: u64) -> Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        let k = 64 - n.leading_zeros();
        loop {
            let candidate = self.getrandbits(host, k)?;
            if candidate < n {
                return Ok(candidate);
            }
        }
    }

    /// Uniform integer in `[start, stop)`.
    pub fn randrange(&mut self, host: &mut dyn HostApi, start: i64, stop: i64) -> Result<i64> {
        if start >= stop {
            return Err(SdkError::Random("empty range for randrange"));
        }
        let width = (stop as i128 - start as i128) as u64;
        Ok((start as i128 + self.randbelow(host, width)? as i128) as i64)
    }

    /// Uniform integer in `[a, b]`, endpoints included.
    pub fn randint(&mut self, host: &mut dyn HostApi, a: i64, b: i64) -> Result<i64> {
        if a > b {
            return Err(SdkError::Random("empty range for randint"));
        }
        let width = b as i128 - a as i128 + 1;
        if width == 1i128 << 64 {
            return Ok(self.getrandbits(host, 64)? as i64);
        }
        Ok((a as i128 + self.randbelow(host, width as u64)? as i128) as i64)
    }

    pub fn choice<'a, T>(&mut self, host: &mut dyn HostApi, items: &'a [T]) -> Result<&'a T> {
        if items.is_empty() {
            return Err(SdkError::Random("choice from empty sequence"));
        }
        let idx = self.randbelow(host, items.len() as u64)? as usize;
        Ok(&items[idx])
    }

    /// In-place Fisher–Yates shuffle.
    pub fn shuffle<T>(&mut self, host: &mut dyn HostApi, items: &mut [T]) -> Result<()> {
        for i in (1..items.len()).rev() {
            let j = self.randbelow(host, (i + 1) as u64)? as usize;
            items.swap(i, j);
        }
        Ok(())
    }

    /// `k` distinct elements, selection without replacement (swap-to-back
    /// over an index pool).
    pub fn sample<T: Clone>(
        &mut self,
        host: &mut dyn HostApi,
        items: &[T],
        k: usize,
    ) -> Result<Vec<T>> {
        if k > items.len() {
            return Err(SdkError::Random("sample larger than population"));
        }
        let mut pool: Vec<usize> = (0..items.len()).collect();
        let mut remaining = pool.len();
        let mut out = Vec::with_capacity(k);
        for _ in 0..k {
            let j = self.randbelow(host, remaining as u64)? as usize;
            out.push(items[pool[j]].clone());
            remaining -= 1;
            pool.swap(j, remaining);
        }
        Ok(out)
    }

    /// Uniform float in `[a, b)` (or `[b, a)` when reversed).
    pub fn uniform(&mut self, host: &mut dyn HostApi, a: f64, b: f64) -> Result<f64> {
        Ok(a + (b - a) * self.random(host)?)
    }

    pub fn state(&self) -> RngState {
        RngState {
            version: RNG_STATE_VERSION,
            seed_prefix: self.seed_prefix.clone(),
            counter: self.counter,
            buffer: self.buffer.clone(),
            buffer_pos: self.buffer_pos,
        }
    }

    /// Restore a previously exported state. Field types are enforced by the
    /// struct shape; version and cursor bounds are validated here.
    pub fn set_state(&mut self, state: &RngState) -> Result<()> {
        if state.version != RNG_STATE_VERSION {
            return Err(SdkError::RngState("unsupported version"));
        }
        if state.buffer_pos > state.buffer.len() {
            return Err(SdkError::RngState("buffer_pos out of range"));
        }
        self.seed_prefix = state.seed_prefix.clone();
        self.counter = state.counter;
        self.buffer = state.buffer.clone();
        self.buffer_pos = state.buffer_pos;
        Ok(())
    }
}
