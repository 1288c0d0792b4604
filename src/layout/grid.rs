use super::{FloorPlan, LayoutError};

/// Largest grid `validate` will rasterize.
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Occupancy grid of a validated floor plan: each cell holds the index of the
/// region covering it.
#[derive(Debug, Clone)]
pub struct FloorMatrix {
    width: usize,
    height: usize,
    cells: Vec<Option<usize>>,
}

impl FloorMatrix {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn region_at(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y * self.width + x]
    }
}

impl FloorPlan {
    /// Rasterizes every region, failing on the first inverted, out-of-bounds
    /// or overlapping one.
    pub fn validate(&self) -> Result<FloorMatrix, LayoutError> {
        let width = self.width as usize;
        let height = self.height as usize;
        let area = width
            .checked_mul(height)
            .filter(|area| *area <= MAX_GRID_CELLS)
            .ok_or(LayoutError::TooLarge {
                width: self.width,
                height: self.height,
                limit: MAX_GRID_CELLS,
            })?;
        let mut cells: Vec<Option<usize>> = vec![None; area];

        for (idx, region) in self.regions.iter().enumerate() {
            if region.start_x > region.end_x || region.start_y > region.end_y {
                return Err(LayoutError::InvertedRegion {
                    region: region.id.clone(),
                });
            }
            if region.start_x < 0
                || region.start_y < 0
                || region.end_x >= self.width as i32
                || region.end_y >= self.height as i32
            {
                return Err(LayoutError::OutOfBounds {
                    region: region.id.clone(),
                    width: self.width,
                    height: self.height,
                });
            }

            for y in region.start_y..=region.end_y {
                for x in region.start_x..=region.end_x {
                    let cell = &mut cells[y as usize * width + x as usize];
                    if let Some(other) = *cell {
                        return Err(LayoutError::Overlap {
                            region: region.id.clone(),
                            other: self.regions[other].id.clone(),
                            x,
                            y,
                        });
                    }
                    *cell = Some(idx);
                }
            }
        }

        Ok(FloorMatrix {
            width,
            height,
            cells,
        })
    }
}
