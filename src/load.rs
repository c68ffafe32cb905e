use std::fs::File;
use std::io::{self, Cursor, Read, Seek};

use array_init::try_array_init;
use byteorder::{BigEndian, ReadBytesExt};
use derive_new::new;
use log::info;
use zip::ZipArchive;

use crate::{FloorPlan, Point};

pub const FLOORS_SIZE: usize = 5;

const LANDMARKS_ENTRY: &str = "landmarks.dat";

/// Cached landmark extractor output, one entry per building floor.
#[derive(Debug, new)]
pub struct FloorPlans {
    floors: [FloorPlan; FLOORS_SIZE],
}

impl FloorPlans {
    pub fn load(file_path: &str) -> Result<Self, io::Error> {
        let file = File::open(file_path)?;
        let floor_plans = Self::read_from(file)?;

        info!(
            "loaded {} floors, {} landmarks from {}",
            FLOORS_SIZE,
            floor_plans
                .floors
                .iter()
                .map(|f| f.landmarks.len())
                .sum::<usize>(),
            file_path
        );

        Ok(floor_plans)
    }

    /**
     * Reads the `landmarks.dat` entry of a zip archive. Per floor, big-endian:
     * rows, cols and count as i32, then count (x, y) pairs as f64.
     */
    pub fn read_from<R: Read + Seek>(reader: R) -> Result<Self, io::Error> {
        let mut archive = ZipArchive::new(reader)?;

        let mut landmarks_file = archive.by_name(LANDMARKS_ENTRY)?;
        let mut buffer = Vec::new();
        landmarks_file.read_to_end(&mut buffer)?;

        let mut cursor = Cursor::new(buffer);

        let floors = try_array_init(|_| read_floor(&mut cursor))?;

        Ok(Self::new(floors))
    }

    pub fn get_floor(&self, floor: usize) -> Option<&FloorPlan> {
        self.floors.get(floor)
    }

    pub fn floors(&self) -> &[FloorPlan] {
        &self.floors
    }
}

fn read_floor(cursor: &mut Cursor<Vec<u8>>) -> Result<FloorPlan, io::Error> {
    let rows = read_size(cursor, "rows")?;
    let cols = read_size(cursor, "cols")?;
    let count = read_size(cursor, "count")? as usize;

    // count comes from the file; don't trust it for the allocation
    let mut landmarks = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let x = cursor.read_f64::<BigEndian>()?;
        let y = cursor.read_f64::<BigEndian>()?;
        if !(x.is_finite() && y.is_finite()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non-finite landmark: ({x},{y})"),
            ));
        }
        landmarks.push(Point::new(x, y));
    }

    Ok(FloorPlan::new(rows, cols, landmarks))
}

fn read_size(cursor: &mut Cursor<Vec<u8>>, field: &str) -> Result<u32, io::Error> {
    let value = cursor.read_i32::<BigEndian>()?;
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative {field}: {value}"),
        )
    })
}
