//! Built-in project and facet catalogue.
//!
//! Reference data for the projects the portal can search, their facets and
//! the facet group each facet is displayed under. Seeding this catalogue into
//! a store is idempotent: entries are keyed by name.

use serde::Serialize;

/// A facet group shared by all projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogGroup {
    pub name: &'static str,
    pub description: &'static str,
}

/// A project with its facets listed per group, in display order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogProject {
    pub name: &'static str,
    pub full_name: &'static str,
    pub description: &'static str,
    pub groups: &'static [(&'static str, &'static [&'static str])],
}

impl CatalogProject {
    /// Facets in display order paired with their group name.
    pub fn facets(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.groups
            .iter()
            .flat_map(|(group, facets)| facets.iter().map(move |facet| (*facet, *group)))
    }
}

pub const GENERAL: &str = "General";
pub const IDENTIFIERS: &str = "Identifiers";
pub const RESOLUTIONS: &str = "Resolutions";
pub const LABELS: &str = "Labels";
pub const CLASSIFICATIONS: &str = "Classifications";
pub const CMIP5_ATTRIBUTES: &str = "CMIP5 Attributes";
pub const CMIP6_ATTRIBUTES: &str = "CMIP6 Attributes";

pub const FACET_GROUPS: &[CatalogGroup] = &[
    CatalogGroup {
        name: GENERAL,
        description: "Project-wide facets such as activity and data node",
    },
    CatalogGroup {
        name: IDENTIFIERS,
        description: "Sources, institutions and experiments",
    },
    CatalogGroup {
        name: RESOLUTIONS,
        description: "Grid and model resolutions",
    },
    CatalogGroup {
        name: LABELS,
        description: "Variant and grid labels",
    },
    CatalogGroup {
        name: CLASSIFICATIONS,
        description: "Tables, frequencies, realms and variables",
    },
    CatalogGroup {
        name: CMIP5_ATTRIBUTES,
        description: "CMIP5-era attributes of observational datasets",
    },
    CatalogGroup {
        name: CMIP6_ATTRIBUTES,
        description: "CMIP6-era attributes of observational datasets",
    },
];

pub const PROJECTS: &[CatalogProject] = &[
    CatalogProject {
        name: "CMIP6",
        full_name: "Coupled Model Intercomparison Project Phase 6",
        description: "The sixth phase of the WCRP coupled model intercomparison.",
        groups: &[
            (GENERAL, &["activity_id", "data_node"]),
            (
                IDENTIFIERS,
                &[
                    "source_id",
                    "institution_id",
                    "source_type",
                    "experiment_id",
                    "sub_experiment_id",
                ],
            ),
            (RESOLUTIONS, &["nominal_resolution"]),
            (LABELS, &["variant_label", "grid_label"]),
            (
                CLASSIFICATIONS,
                &[
                    "table_id",
                    "frequency",
                    "realm",
                    "variable_id",
                    "cf_standard_name",
                ],
            ),
        ],
    },
    CatalogProject {
        name: "CMIP5",
        full_name: "Coupled Model Intercomparison Project Phase 5",
        description: "The fifth phase of the WCRP coupled model intercomparison.",
        groups: &[
            (
                GENERAL,
                &["project", "product", "institute", "model", "data_node"],
            ),
            (IDENTIFIERS, &["experiment", "experiment_family"]),
            (
                CLASSIFICATIONS,
                &[
                    "time_frequency",
                    "realm",
                    "cmor_table",
                    "ensemble",
                    "variable",
                    "variable_long_name",
                    "cf_standard_name",
                ],
            ),
        ],
    },
    CatalogProject {
        name: "E3SM",
        full_name: "Energy Exascale Earth System Model",
        description: "Simulations from the DOE Energy Exascale Earth System Model.",
        groups: &[
            (GENERAL, &["data_node"]),
            (
                IDENTIFIERS,
                &["experiment", "science_driver", "model_version"],
            ),
            (
                CLASSIFICATIONS,
                &[
                    "realm",
                    "regridding",
                    "time_frequency",
                    "data_type",
                    "ensemble_member",
                    "tuning",
                    "campaign",
                    "period",
                ],
            ),
            (
                RESOLUTIONS,
                &[
                    "atmos_grid_resolution",
                    "ocean_grid_resolution",
                    "land_grid_resolution",
                    "seaice_grid_resolution",
                ],
            ),
        ],
    },
    CatalogProject {
        name: "CMIP3",
        full_name: "Coupled Model Intercomparison Project Phase 3",
        description: "The third phase of the WCRP coupled model intercomparison.",
        groups: &[
            (GENERAL, &["model", "experiment", "institute"]),
            (
                CLASSIFICATIONS,
                &["variable", "realm", "time_frequency", "ensemble"],
            ),
        ],
    },
    CatalogProject {
        name: "input4MIPs",
        full_name: "Input Datasets for Model Intercomparison Projects",
        description: "Forcing and boundary condition datasets used by MIPs.",
        groups: &[
            (GENERAL, &["target_mip_list", "dataset_status"]),
            (
                IDENTIFIERS,
                &["institution_id", "source_id", "source_version"],
            ),
            (
                CLASSIFICATIONS,
                &[
                    "dataset_category",
                    "variable_id",
                    "grid_label",
                    "nominal_resolution",
                    "frequency",
                    "realm",
                ],
            ),
        ],
    },
    CatalogProject {
        name: "obs4MIPs",
        full_name: "Observations for Model Intercomparison Projects",
        description: "Observational products formatted for model evaluation.",
        groups: &[
            (GENERAL, &["product", "realm", "data_node"]),
            (IDENTIFIERS, &["source_id"]),
            (
                CLASSIFICATIONS,
                &["variable", "variable_long_name", "cf_standard_name"],
            ),
            (CMIP5_ATTRIBUTES, &["institute", "time_frequency"]),
            (
                CMIP6_ATTRIBUTES,
                &[
                    "institution_id",
                    "frequency",
                    "grid_label",
                    "nominal_resolution",
                    "region",
                    "source_type",
                    "variant_label",
                ],
            ),
        ],
    },
];

/// Look up a catalogue project by name, ignoring case.
pub fn find_project(name: &str) -> Option<&'static CatalogProject> {
    PROJECTS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_group_reference_is_declared() {
        let declared: HashSet<_> = FACET_GROUPS.iter().map(|g| g.name).collect();
        for project in PROJECTS {
            for (group, _) in project.groups {
                assert!(declared.contains(group), "{} uses unknown group {}", project.name, group);
            }
        }
    }

    #[test]
    fn test_facet_names_unique_per_project() {
        for project in PROJECTS {
            let mut seen = HashSet::new();
            for (facet, _) in project.facets() {
                assert!(seen.insert(facet), "{} lists {} twice", project.name, facet);
            }
        }
    }

    #[test]
    fn test_project_names_unique() {
        let names: HashSet<_> = PROJECTS.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PROJECTS.len());
    }

    #[test]
    fn test_find_project_case_insensitive() {
        let project = find_project("cmip6").unwrap();
        assert_eq!(project.name, "CMIP6");
        assert_eq!(project.facets().count(), 15);
        assert_eq!(project.facets().next(), Some(("activity_id", GENERAL)));
        assert!(find_project("CMIP7").is_none());
    }
}
