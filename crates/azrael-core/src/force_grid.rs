//! Named sparse 3-D vector fields sampled each tick (C3, §4.3).

use std::collections::HashMap;

use crate::error::CoreError;
use crate::vector::Vec3;

type Cell = (i64, i64, i64);

/// One named vector field: a sparse map from grid cell to `vector_dim`
/// vector. Cells holding the zero vector are never stored (§3, P6).
#[derive(Debug, Clone)]
struct GridField {
    vector_dim: usize,
    granularity: f64,
    cells: HashMap<Cell, Vec<f64>>,
}

impl GridField {
    fn cell_of(&self, pos: Vec3) -> Cell {
        (
            (pos.x / self.granularity).floor() as i64,
            (pos.y / self.granularity).floor() as i64,
            (pos.z / self.granularity).floor() as i64,
        )
    }
}

/// A collection of named force fields.
#[derive(Debug, Default)]
pub struct ForceGrid {
    fields: HashMap<String, GridField>,
}

impl ForceGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new named field. Fails with [`CoreError::BadParams`] if
    /// `vector_dim` or `granularity` is non-positive, or
    /// [`CoreError::Duplicate`] if the name already exists.
    pub fn define(&mut self, name: &str, vector_dim: usize, granularity: f64) -> Result<(), CoreError> {
        if self.fields.contains_key(name) {
            return Err(CoreError::Duplicate(format!("force field {name}")));
        }
        if vector_dim == 0 {
            return Err(CoreError::BadParams("vector_dim must be positive".into()));
        }
        if !(granularity > 0.0) {
            return Err(CoreError::BadParams("granularity must be positive".into()));
        }
        self.fields.insert(
            name.to_string(),
            GridField {
                vector_dim,
                granularity,
                cells: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Deletes a named field. No-op (ok) if it doesn't exist.
    pub fn delete(&mut self, name: &str) {
        self.fields.remove(name);
    }

    /// Deletes every field.
    pub fn delete_all(&mut self) {
        self.fields.clear();
    }

    /// Clears all cells of a field, leaving it defined.
    pub fn reset(&mut self, name: &str) -> Result<(), CoreError> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(format!("force field {name}")))?;
        field.cells.clear();
        Ok(())
    }

    /// Lists every currently defined field name.
    pub fn list_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Sets the value at each position's cell. Writing the zero vector
    /// deletes that cell (§3, P6). Rejects an empty list or a vector whose
    /// dimension doesn't match the field.
    pub fn set_values(&mut self, name: &str, values: &[(Vec3, Vec<f64>)]) -> Result<(), CoreError> {
        if values.is_empty() {
            return Err(CoreError::BadParams("set_values requires a non-empty list".into()));
        }
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(format!("force field {name}")))?;
        for (_pos, vec) in values {
            if vec.len() != field.vector_dim {
                return Err(CoreError::BadParams(format!(
                    "expected a {}-vector, got {}",
                    field.vector_dim,
                    vec.len()
                )));
            }
        }
        for (pos, vec) in values {
            let cell = field.cell_of(*pos);
            if vec.iter().all(|c| *c == 0.0) {
                field.cells.remove(&cell);
            } else {
                field.cells.insert(cell, vec.clone());
            }
        }
        Ok(())
    }

    /// Samples the field at each position. Missing cells read as zero.
    /// Rejects an empty list or an undefined field name.
    pub fn get_values(&self, name: &str, positions: &[Vec3]) -> Result<Vec<Vec<f64>>, CoreError> {
        if positions.is_empty() {
            return Err(CoreError::BadParams("get_values requires a non-empty list".into()));
        }
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| CoreError::NotFound(format!("force field {name}")))?;
        Ok(positions
            .iter()
            .map(|pos| {
                let cell = field.cell_of(*pos);
                field
                    .cells
                    .get(&cell)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; field.vector_dim])
            })
            .collect())
    }

    /// Sets a rectangular region of cells starting at `origin`'s cell,
    /// spanning `[nx, ny, nz]` cells, from a flattened `[nx * ny * nz *
    /// vector_dim]` array in x-major, then y, then z order.
    pub fn set_region(
        &mut self,
        name: &str,
        origin: Vec3,
        dims: (usize, usize, usize),
        values: &[f64],
    ) -> Result<(), CoreError> {
        let (nx, ny, nz) = dims;
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| CoreError::NotFound(format!("force field {name}")))?;
        let expected = nx * ny * nz * field.vector_dim;
        if values.len() != expected {
            return Err(CoreError::BadParams(format!(
                "expected {expected} values, got {}",
                values.len()
            )));
        }
        let granularity = field.granularity;
        let vector_dim = field.vector_dim;
        let origin_cell = field.cell_of(origin);

        let mut batch = Vec::with_capacity(nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let idx = ((iz * ny + iy) * nx + ix) * vector_dim;
                    let vec = values[idx..idx + vector_dim].to_vec();
                    let pos = Vec3::new(
                        (origin_cell.0 + ix as i64) as f64 * granularity,
                        (origin_cell.1 + iy as i64) as f64 * granularity,
                        (origin_cell.2 + iz as i64) as f64 * granularity,
                    );
                    batch.push((pos, vec));
                }
            }
        }
        self.set_values(name, &batch)
    }

    /// Reads back a rectangular region of cells, in the same layout used by
    /// [`Self::set_region`].
    pub fn get_region(
        &self,
        name: &str,
        origin: Vec3,
        dims: (usize, usize, usize),
    ) -> Result<Vec<f64>, CoreError> {
        let (nx, ny, nz) = dims;
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| CoreError::NotFound(format!("force field {name}")))?;
        let origin_cell = field.cell_of(origin);
        let mut out = Vec::with_capacity(nx * ny * nz * field.vector_dim);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let cell = (
                        origin_cell.0 + ix as i64,
                        origin_cell.1 + iy as i64,
                        origin_cell.2 + iz as i64,
                    );
                    match field.cells.get(&cell) {
                        Some(v) => out.extend_from_slice(v),
                        None => out.extend(std::iter::repeat(0.0).take(field.vector_dim)),
                    }
                }
            }
        }
        Ok(out)
    }
}
