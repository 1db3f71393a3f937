use crate::error::{Result, VectorStoreError};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

const INDEX_MAGIC: &[u8; 4] = b"LWVI";
const INDEX_FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

/// Flat nearest-neighbor index over fixed-dimension vectors using squared
/// L2 distance, persisted as a single binary file.
///
/// Ids are assigned sequentially on insertion and never reused. The whole
/// index lives in memory; this trades scalability for exact results and a
/// trivially crash-safe on-disk format.
pub struct FlatL2Index {
    path: PathBuf,
    dimension: usize,
    // Row-major, len is always a multiple of `dimension`.
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Open the index file, falling back to a fresh empty index when the
    /// file is missing, unreadable, corrupt, or was built with a different
    /// dimension. Startup never fails on a bad index; it is rebuilt over
    /// subsequent runs instead.
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let empty = Self {
            path: path.clone(),
            dimension,
            data: Vec::new(),
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no vector index at {}, starting empty", path.display());
                return empty;
            }
            Err(err) => {
                log::warn!(
                    "failed to read vector index {}, starting empty: {err}",
                    path.display()
                );
                return empty;
            }
        };

        match decode(&bytes) {
            Some((dim, data)) if dim == dimension => {
                log::debug!(
                    "loaded {} vectors from {}",
                    data.len() / dimension.max(1),
                    path.display()
                );
                Self {
                    path,
                    dimension,
                    data,
                }
            }
            Some((dim, _)) => {
                log::warn!(
                    "vector index {} has dimension {dim}, expected {dimension}; starting empty",
                    path.display()
                );
                empty
            }
            None => {
                log::warn!("vector index {} is corrupt, starting empty", path.display());
                empty
            }
        }
    }

    /// Append a batch of vectors. The whole batch is validated before any
    /// vector is inserted so a bad input cannot leave a partial batch behind.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Exact k-nearest-neighbor search; returns `(id, squared L2 distance)`
    /// pairs, nearest first. An empty index yields an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, row)| (id, squared_l2(query, row)))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Atomically rewrite the index file.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = encode(self.dimension, &self.data);
        let tmp = self.path.with_extension("lwvi.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn encode(dimension: usize, data: &[f32]) -> Vec<u8> {
    let count = if dimension == 0 {
        0u64
    } else {
        (data.len() / dimension) as u64
    };
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    let dim = dimension as u32;
    out.extend_from_slice(&dim.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode(bytes: &[u8]) -> Option<(usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != INDEX_MAGIC {
        return None;
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
    if version != INDEX_FORMAT_VERSION {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[8..12].try_into().ok()?) as usize;
    let count = usize::try_from(u64::from_le_bytes(bytes[12..20].try_into().ok()?)).ok()?;
    if dim == 0 {
        return None;
    }
    let values = count.checked_mul(dim)?;
    let expected_len = HEADER_LEN.checked_add(values.checked_mul(4)?)?;
    if bytes.len() != expected_len {
        return None;
    }
    let mut data = Vec::with_capacity(values);
    for i in 0..values {
        let start = HEADER_LEN + i * 4;
        let end = start + 4;
        data.push(f32::from_le_bytes(bytes[start..end].try_into().ok()?));
    }
    Some((dim, data))
}
