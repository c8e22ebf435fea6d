use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array3;

use crate::grid::{AxisSpec, GridSpec};

use super::VoxelMap;

const MAGIC: &[u8; 4] = b"DMAP";
const VERSION: u32 = 1;

fn write_u32(w: &mut impl Write, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_f64(w: &mut impl Write, v: f64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_axis(w: &mut impl Write, axis: &AxisSpec) -> io::Result<()> {
    write_f64(w, axis.lim0)?;
    write_f64(w, axis.lim1)?;
    write_u32(w, axis.bins as u32)
}

fn read_axis(r: &mut impl Read) -> io::Result<AxisSpec> {
    let lim0 = read_f64(r)?;
    let lim1 = read_f64(r)?;
    let bins = read_u32(r)? as usize;
    Ok(AxisSpec { lim0, lim1, bins })
}

fn write_channel(w: &mut impl Write, channel: &Array3<f64>) -> io::Result<()> {
    for &v in channel.iter() {
        write_f64(w, v)?;
    }
    Ok(())
}

fn read_channel(r: &mut impl Read, shape: (usize, usize, usize)) -> io::Result<Array3<f64>> {
    let len = shape.0 * shape.1 * shape.2;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(read_f64(r)?);
    }
    Array3::from_shape_vec(shape, values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

impl VoxelMap {
    /// Persist the map: magic + version, then per-axis header scalars
    /// (lim0, lim1, bin count for b, l, r), then the four channels in
    /// row-major order. NaN and infinity markers survive bit-exactly.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        w.write_all(MAGIC)?;
        write_u32(&mut w, VERSION)?;
        write_axis(&mut w, &self.grid.b)?;
        write_axis(&mut w, &self.grid.l)?;
        write_axis(&mut w, &self.grid.r)?;

        write_channel(&mut w, &self.mean_reddening)?;
        write_channel(&mut w, &self.mean_extinction)?;
        write_channel(&mut w, &self.std_reddening)?;
        write_channel(&mut w, &self.std_extinction)?;

        w.flush()
    }

    pub fn load(path: &Path) -> io::Result<VoxelMap> {
        let file = File::open(path)?;
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid magic bytes",
            ));
        }

        let version = read_u32(&mut r)?;
        if version != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported version: {version}"),
            ));
        }

        let b = read_axis(&mut r)?;
        let l = read_axis(&mut r)?;
        let r_axis = read_axis(&mut r)?;
        let grid = GridSpec::new(b, l, r_axis)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let shape = grid.shape();
        let mean_reddening = read_channel(&mut r, shape)?;
        let mean_extinction = read_channel(&mut r, shape)?;
        let std_reddening = read_channel(&mut r, shape)?;
        let std_extinction = read_channel(&mut r, shape)?;

        Ok(VoxelMap {
            grid,
            mean_reddening,
            mean_extinction,
            std_reddening,
            std_extinction,
        })
    }
}
