use serde::Serialize;
use serde_json::{Value, json};

use crate::error::SubsetError;

/// Spatial box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, SubsetError> {
        let bbox = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    fn validate(&self) -> Result<(), SubsetError> {
        let coords = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(SubsetError::InvalidRequest(
                "box coordinates must be finite".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.min_lon) || !(-180.0..=180.0).contains(&self.max_lon) {
            return Err(SubsetError::InvalidRequest(format!(
                "longitude out of range [-180, 180]: {}..{}",
                self.min_lon, self.max_lon
            )));
        }
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err(SubsetError::InvalidRequest(format!(
                "latitude out of range [-90, 90]: {}..{}",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon > self.max_lon || self.min_lat > self.max_lat {
            return Err(SubsetError::InvalidRequest(format!(
                "box must be ordered min/max, got [{}, {}, {}, {}]",
                self.min_lon, self.min_lat, self.max_lon, self.max_lat
            )));
        }
        Ok(())
    }

    /// `[minlon, minlat, maxlon, maxlat]`, the order the service expects.
    pub fn to_wsp(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

/// Time range as strings in the service's format (e.g. `1980-01` or
/// `1980-01-01T00:00:00`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetVariable {
    #[serde(rename = "datasetId")]
    pub dataset_id: String,
    pub variable: String,
}

/// Server-side regridding applied to the subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regrid {
    /// Interpolation method, e.g. `remapbil`.
    pub mapping: String,
    /// Destination grid, e.g. `fv4x5`.
    pub grid: String,
}

/// A subset job description. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    data: Vec<DatasetVariable>,
    bbox: BoundingBox,
    time: TimeRange,
    crop: bool,
    regrid: Option<Regrid>,
}

impl SubsetRequest {
    pub fn builder(dataset_id: &str, variable: &str) -> SubsetRequestBuilder {
        SubsetRequestBuilder {
            data: vec![DatasetVariable {
                dataset_id: dataset_id.to_string(),
                variable: variable.to_string(),
            }],
            bbox: None,
            time: None,
            crop: true,
            regrid: None,
        }
    }

    pub fn dataset_id(&self) -> &str {
        &self.data[0].dataset_id
    }

    pub fn variable(&self) -> &str {
        &self.data[0].variable
    }

    pub fn data(&self) -> &[DatasetVariable] {
        &self.data
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn time(&self) -> &TimeRange {
        &self.time
    }

    pub fn crop(&self) -> bool {
        self.crop
    }

    pub fn regrid(&self) -> Option<&Regrid> {
        self.regrid.as_ref()
    }

    /// `args` of the `subset` call.
    pub(crate) fn to_args(&self) -> Value {
        let mut args = json!({
            "role": "subset",
            "start": self.time.start,
            "end": self.time.end,
            "box": self.bbox.to_wsp(),
            "crop": self.crop,
            "data": self.data,
        });
        if let (Some(regrid), Some(obj)) = (&self.regrid, args.as_object_mut()) {
            obj.insert("mapping".into(), Value::String(regrid.mapping.clone()));
            obj.insert("grid".into(), Value::String(regrid.grid.clone()));
        }
        args
    }
}

#[derive(Debug, Clone)]
pub struct SubsetRequestBuilder {
    data: Vec<DatasetVariable>,
    bbox: Option<BoundingBox>,
    time: Option<TimeRange>,
    crop: bool,
    regrid: Option<Regrid>,
}

impl SubsetRequestBuilder {
    pub fn bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn time_range(mut self, start: &str, end: &str) -> Self {
        self.time = Some(TimeRange::new(start, end));
        self
    }

    pub fn crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    /// Adds another dataset/variable pair to the same job.
    pub fn also(mut self, dataset_id: &str, variable: &str) -> Self {
        self.data.push(DatasetVariable {
            dataset_id: dataset_id.to_string(),
            variable: variable.to_string(),
        });
        self
    }

    pub fn regrid(mut self, mapping: &str, grid: &str) -> Self {
        self.regrid = Some(Regrid {
            mapping: mapping.to_string(),
            grid: grid.to_string(),
        });
        self
    }

    pub fn build(self) -> Result<SubsetRequest, SubsetError> {
        for dv in &self.data {
            if dv.dataset_id.trim().is_empty() || dv.variable.trim().is_empty() {
                return Err(SubsetError::InvalidRequest(
                    "dataset id and variable must not be empty".into(),
                ));
            }
        }

        let bbox = self
            .bbox
            .ok_or_else(|| missing("bounding box"))?;
        bbox.validate()?;

        let time = self.time.ok_or_else(|| missing("time range"))?;
        if time.start.trim().is_empty() || time.end.trim().is_empty() {
            return Err(SubsetError::InvalidRequest(
                "time range start and end must not be empty".into(),
            ));
        }

        if let Some(r) = &self.regrid {
            if r.mapping.trim().is_empty() || r.grid.trim().is_empty() {
                return Err(SubsetError::InvalidRequest(
                    "regrid mapping and grid must not be empty".into(),
                ));
            }
        }

        Ok(SubsetRequest {
            data: self.data,
            bbox,
            time,
            crop: self.crop,
            regrid: self.regrid,
        })
    }
}

fn missing(what: &str) -> SubsetError {
    SubsetError::InvalidRequest(format!("missing {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn karakoram() -> BoundingBox {
        BoundingBox::new(70.0, 24.0, 90.0, 39.0).unwrap()
    }

    #[test]
    fn args_match_service_layout() {
        let req = SubsetRequest::builder("M2T1NXFLX_V5.12.4", "PRECTOT")
            .bbox(karakoram())
            .time_range("1980-01", "1980-02")
            .build()
            .unwrap();

        assert_eq!(
            req.to_args(),
            json!({
                "role": "subset",
                "start": "1980-01",
                "end": "1980-02",
                "box": [70.0, 24.0, 90.0, 39.0],
                "crop": true,
                "data": [{ "datasetId": "M2T1NXFLX_V5.12.4", "variable": "PRECTOT" }]
            })
        );
    }

    #[test]
    fn regrid_and_extra_variables_are_sent() {
        let req = SubsetRequest::builder("M2T1NXFLX_V5.12.4", "PRECTOT")
            .also("M2T1NXLND_5.12.4", "PRECTOTLAND")
            .bbox(karakoram())
            .time_range("1980-01", "1980-02")
            .crop(false)
            .regrid("remapbil", "fv4x5")
            .build()
            .unwrap();

        let args = req.to_args();
        assert_eq!(args["mapping"], "remapbil");
        assert_eq!(args["grid"], "fv4x5");
        assert_eq!(args["crop"], false);
        assert_eq!(args["data"].as_array().unwrap().len(), 2);
        assert_eq!(req.variable(), "PRECTOT");
    }

    #[test]
    fn unordered_box_is_rejected() {
        assert!(matches!(
            BoundingBox::new(90.0, 24.0, 70.0, 39.0),
            Err(SubsetError::InvalidRequest(_))
        ));
        assert!(BoundingBox::new(-181.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, -91.0, 1.0, 0.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn missing_parts_are_rejected() {
        let no_time = SubsetRequest::builder("M2T1NXFLX", "PRECTOT")
            .bbox(karakoram())
            .build();
        assert!(no_time.is_err());

        let empty_var = SubsetRequest::builder("M2T1NXFLX", " ")
            .bbox(karakoram())
            .time_range("1980-01", "1980-02")
            .build();
        assert!(empty_var.is_err());

        let no_box = SubsetRequest::builder("M2T1NXFLX", "PRECTOT")
            .time_range("1980-01", "1980-02")
            .build();
        assert!(no_box.is_err());
    }
}
