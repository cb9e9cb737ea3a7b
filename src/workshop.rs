//! The shipped workshop production net.
//!
//! Workers and machines are pooled resources. A job needs a queued task, an
//! assigned worker and a reserved machine; finishing it returns both
//! resources and emits a product, which then goes through quality control.
//!
//! | key | place                   | initial |
//! |-----|-------------------------|---------|
//! | P1  | Ouvriers Disponibles    | 3       |
//! | P2  | Machines Libres         | 2       |
//! | P3  | Tâches en Attente       | 0       |
//! | P4  | Ouvrier Assigné         | 0       |
//! | P5  | Machine Réservée        | 0       |
//! | P6  | Production en Cours     | 0       |
//! | P7  | Produits Terminés       | 0       |
//! | P8  | Produits Contrôlés      | 0       |
use crate::net::{Net, NetError, PetriNetEngine, Place, PlaceCategory, Transition, Weight};

const PLACES: &[(&str, &str, Weight, PlaceCategory)] = &[
    ("P1", "Ouvriers Disponibles", 3, PlaceCategory::Resource),
    ("P2", "Machines Libres", 2, PlaceCategory::Resource),
    ("P3", "Tâches en Attente", 0, PlaceCategory::Queue),
    ("P4", "Ouvrier Assigné", 0, PlaceCategory::Assignment),
    ("P5", "Machine Réservée", 0, PlaceCategory::Assignment),
    ("P6", "Production en Cours", 0, PlaceCategory::Process),
    ("P7", "Produits Terminés", 0, PlaceCategory::Output),
    ("P8", "Produits Contrôlés", 0, PlaceCategory::Output),
];

type ArcSpec = (&'static str, Weight);

/// (key, name, inputs, outputs)
const TRANSITIONS: &[(&str, &str, &[ArcSpec], &[ArcSpec])] = &[
    ("T1", "Assigner Ouvrier", &[("P1", 1)], &[("P4", 1)]),
    ("T2", "Réserver Machine", &[("P2", 1)], &[("P5", 1)]),
    (
        "T3",
        "Démarrer Production",
        &[("P4", 1), ("P5", 1), ("P3", 1)],
        &[("P6", 1)],
    ),
    (
        "T4",
        "Terminer Production",
        &[("P6", 1)],
        &[("P7", 1), ("P1", 1), ("P2", 1)],
    ),
    ("T5", "Ajouter Tâche", &[], &[("P3", 1)]),
    ("T6", "Contrôler Qualité", &[("P7", 1)], &[("P8", 1)]),
];

pub fn build() -> Result<Net, NetError> {
    let mut net = Net::empty();
    for (key, name, tokens, category) in PLACES {
        net.add_place(Place::new(*key, *name, *tokens, *category))?;
    }
    for (key, name, inputs, outputs) in TRANSITIONS {
        let transition = net.add_transition(Transition::new(*key, *name))?;
        for (place, weight) in *inputs {
            net.add_input_arc(transition, place, *weight)?;
        }
        for (place, weight) in *outputs {
            net.add_output_arc(transition, place, *weight)?;
        }
    }
    Ok(net)
}

/// Engine over the workshop net.
pub fn engine() -> Result<PetriNetEngine, NetError> {
    build().map(PetriNetEngine::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_build_cleanly() {
        let net = build().unwrap();
        assert_eq!(net.places_len(), 8);
        assert_eq!(net.transitions_len(), 6);

        let report = net.diagnose_connectivity();
        assert!(!report.has_issues(), "{report:?}");
        let sinks = report.sinks.iter().map(|(_, k)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(sinks, vec!["P8"]);
    }

    #[test]
    fn start_production_keeps_arc_order() {
        let net = build().unwrap();
        let t3 = net.transition_id("T3").unwrap();
        let inputs = net.transitions()[t3]
            .inputs()
            .iter()
            .map(|arc| net.places()[arc.place].key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(inputs, vec!["P4", "P5", "P3"]);
    }
}
