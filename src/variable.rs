//! HYCOM variables and the remote file groups they are stored in.

use std::fmt;

use crate::errors::{Error, Result};

/// Canonical names of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableInfo {
    pub code: &'static str,
    pub var_name: &'static str,
    pub standard_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    U,
    V,
    Temp,
    Salt,
    Ssh,
    UBottom,
    VBottom,
    TempBottom,
    SaltBottom,
}

impl Variable {
    pub const ALL: [Variable; 9] = [
        Variable::U,
        Variable::V,
        Variable::Temp,
        Variable::Salt,
        Variable::Ssh,
        Variable::UBottom,
        Variable::VBottom,
        Variable::TempBottom,
        Variable::SaltBottom,
    ];

    pub fn info(self) -> &'static VariableInfo {
        static INFO: [VariableInfo; 9] = [
            VariableInfo {
                code: "u",
                var_name: "water_u",
                standard_name: "eastward_sea_water_velocity",
            },
            VariableInfo {
                code: "v",
                var_name: "water_v",
                standard_name: "northward_sea_water_velocity",
            },
            VariableInfo {
                code: "temp",
                var_name: "water_temp",
                standard_name: "sea_water_potential_temperature",
            },
            VariableInfo {
                code: "salt",
                var_name: "salinity",
                standard_name: "sea_water_salinity",
            },
            VariableInfo {
                code: "ssh",
                var_name: "surf_el",
                standard_name: "sea_surface_elevation",
            },
            VariableInfo {
                code: "u_b",
                var_name: "water_u_bottom",
                standard_name: "eastward_sea_water_velocity_at_sea_floor",
            },
            VariableInfo {
                code: "v_b",
                var_name: "water_v_bottom",
                standard_name: "northward_sea_water_velocity_at_sea_floor",
            },
            VariableInfo {
                code: "temp_b",
                var_name: "water_temp_bottom",
                standard_name: "sea_water_potential_temperature_at_sea_floor",
            },
            VariableInfo {
                code: "salt_b",
                var_name: "salinity_bottom",
                standard_name: "sea_water_salinity_at_sea_floor",
            },
        ];

        &INFO[self as usize]
    }

    /// Accepts the short code, the remote variable name or the CF standard name.
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        Variable::ALL
            .into_iter()
            .find(|v| {
                let info = v.info();
                name == info.code || name == info.var_name || name == info.standard_name
            })
            .ok_or_else(|| Error::InvalidVariable(name.to_string()))
    }

    pub fn code(self) -> &'static str {
        self.info().code
    }

    pub fn var_name(self) -> &'static str {
        self.info().var_name
    }

    /// Full-depth variables. Bottom fields and sea surface height never take
    /// a vertical selector.
    pub fn has_vertical_axis(self) -> bool {
        matches!(
            self,
            Variable::U | Variable::V | Variable::Temp | Variable::Salt
        )
    }

    pub fn group(self) -> VariableGroup {
        match self {
            Variable::U | Variable::V | Variable::UBottom | Variable::VBottom => {
                VariableGroup::Velocity
            }
            Variable::Temp | Variable::Salt | Variable::TempBottom | Variable::SaltBottom => {
                VariableGroup::Tracer
            }
            Variable::Ssh => VariableGroup::Surface,
        }
    }

    /// File group for datasets that store each variable on its own. Bottom
    /// fields are not published that way.
    pub fn single_group(self) -> Option<SingleVarGroup> {
        match self {
            Variable::U => Some(SingleVarGroup::U3z),
            Variable::V => Some(SingleVarGroup::V3z),
            Variable::Temp => Some(SingleVarGroup::T3z),
            Variable::Salt => Some(SingleVarGroup::S3z),
            Variable::Ssh => Some(SingleVarGroup::Ssh),
            _ => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Variables stored together in one remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGroup {
    Velocity,
    Tracer,
    Surface,
}

impl VariableGroup {
    pub const ALL: [VariableGroup; 3] = [
        VariableGroup::Velocity,
        VariableGroup::Tracer,
        VariableGroup::Surface,
    ];

    /// Path segment on the server, also used in grouped file names.
    pub fn key(self) -> &'static str {
        match self {
            VariableGroup::Velocity => "uv3z",
            VariableGroup::Tracer => "ts3z",
            VariableGroup::Surface => "ssh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleVarGroup {
    U3z,
    V3z,
    T3z,
    S3z,
    Ssh,
}

impl SingleVarGroup {
    pub fn key(self) -> &'static str {
        match self {
            SingleVarGroup::U3z => "u3z",
            SingleVarGroup::V3z => "v3z",
            SingleVarGroup::T3z => "t3z",
            SingleVarGroup::S3z => "s3z",
            SingleVarGroup::Ssh => "ssh",
        }
    }
}

/// Normalises user supplied names, dropping repeats but keeping order.
pub fn normalise_variables<S: AsRef<str>>(names: &[S]) -> Result<Vec<Variable>> {
    if names.is_empty() {
        return Err(Error::InvalidVariable(String::new()));
    }

    let mut variables = Vec::with_capacity(names.len());
    for name in names {
        let variable = Variable::from_name(name.as_ref())?;
        if !variables.contains(&variable) {
            variables.push(variable);
        }
    }

    Ok(variables)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_all_name_forms() {
        assert_eq!(Variable::from_name("u").unwrap(), Variable::U);
        assert_eq!(Variable::from_name("water_u").unwrap(), Variable::U);
        assert_eq!(
            Variable::from_name("sea_water_salinity_at_sea_floor").unwrap(),
            Variable::SaltBottom
        );
        assert_eq!(Variable::from_name("surf_el").unwrap(), Variable::Ssh);
    }

    #[test]
    fn should_reject_unknown_variable() {
        assert!(matches!(
            Variable::from_name("wind"),
            Err(Error::InvalidVariable(_))
        ));
    }

    #[test]
    fn should_round_trip_codes() {
        for v in Variable::ALL {
            assert_eq!(Variable::from_name(v.code()).unwrap(), v);
        }
    }

    #[test]
    fn should_group_every_variable() {
        assert_eq!(Variable::UBottom.group(), VariableGroup::Velocity);
        assert_eq!(Variable::Salt.group(), VariableGroup::Tracer);
        assert_eq!(Variable::Ssh.group().key(), "ssh");
        assert_eq!(Variable::TempBottom.single_group(), None);
        assert_eq!(Variable::Temp.single_group().map(|g| g.key()), Some("t3z"));
    }

    #[test]
    fn should_normalise_and_dedup() {
        let vars = normalise_variables(&["water_temp", "u", "temp"]).unwrap();
        assert_eq!(vars, vec![Variable::Temp, Variable::U]);
    }

    #[test]
    fn should_fail_on_empty_variable_list() {
        let empty: [&str; 0] = [];
        assert!(normalise_variables(&empty).is_err());
    }
}
