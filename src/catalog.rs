use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One star from the input catalog.
///
/// Angles in degrees (`b` in [-90, 90], `l` in [0, 360)), distances in
/// kpc. Converting the source catalog's distance units to kpc is the
/// catalog producer's responsibility.
#[derive(Debug, Clone, Copy)]
pub struct StarRecord {
    /// Galactic latitude.
    pub b: f64,
    /// Galactic longitude.
    pub l: f64,
    /// Distance to the sun.
    pub dist: f64,
    pub dist_err: f64,
    /// Reddening.
    pub e: f64,
    pub e_err: f64,
    /// Extinction.
    pub a: f64,
    pub a_err: f64,
}

/// Read a plain-text catalog: one star per line, eight columns
/// `b l dist dist_err E E_err A A_err`, separated by whitespace or
/// commas. Blank lines and lines starting with `#` are skipped.
pub fn read_catalog(path: &Path) -> io::Result<Vec<StarRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut stars = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<f64> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line {}: invalid number '{s}'", lineno + 1),
                    )
                })
            })
            .collect::<io::Result<_>>()?;

        if fields.len() != 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected 8 columns, got {}", lineno + 1, fields.len()),
            ));
        }

        stars.push(StarRecord {
            b: fields[0],
            l: fields[1],
            dist: fields[2],
            dist_err: fields[3],
            e: fields[4],
            e_err: fields[5],
            a: fields[6],
            a_err: fields[7],
        });
    }

    Ok(stars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("dustmap_test_{name}_{}.txt", std::process::id()))
    }

    #[test]
    fn reads_whitespace_and_comma_columns() {
        let path = temp_path("catalog_ok");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "# b l dist dist_err E E_err A A_err").unwrap();
            writeln!(f, "0.0 10.0 1.2 0.05 0.5 0.01 0.9 0.02").unwrap();
            writeln!(f).unwrap();
            writeln!(f, "-30.0,200.0,0.8,0.1,0.3,0.02,0.6,0.03").unwrap();
        }
        let stars = read_catalog(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(stars.len(), 2);
        assert_eq!(stars[0].l, 10.0);
        assert_eq!(stars[0].e, 0.5);
        assert_eq!(stars[1].b, -30.0);
        assert_eq!(stars[1].a_err, 0.03);
    }

    #[test]
    fn rejects_short_lines() {
        let path = temp_path("catalog_short");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "0.0 10.0 1.2 0.05 0.5").unwrap();
        }
        let err = read_catalog(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_bad_numbers() {
        let path = temp_path("catalog_badnum");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "0.0 ten 1.2 0.05 0.5 0.01 0.9 0.02").unwrap();
        }
        let err = read_catalog(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
