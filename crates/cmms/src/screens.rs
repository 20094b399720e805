//! Built-in screen catalog.
//!
//! The maintenance catalogs every CMMS deployment ships with. Screens of the
//! same name in the config file replace these; new names extend the list.

use cmms_config::{ColumnSpec, Config, ScreenSpec};
use cmms_core::{FieldDescriptor, FieldKind, OptionsSource};

use crate::error::CliError;

fn columns(pairs: &[(&str, &str)]) -> Vec<ColumnSpec> {
    pairs
        .iter()
        .map(|(header, accessor)| ColumnSpec {
            header: (*header).to_owned(),
            accessor: (*accessor).to_owned(),
        })
        .collect()
}

fn screen(
    name: &str,
    title: &str,
    pk_field: &str,
    columns: Vec<ColumnSpec>,
    fields: Vec<FieldDescriptor>,
) -> ScreenSpec {
    ScreenSpec {
        name: name.to_owned(),
        title: title.to_owned(),
        endpoint: name.to_owned(),
        pk_field: pk_field.to_owned(),
        columns,
        fields,
    }
}

pub fn builtin() -> Vec<ScreenSpec> {
    vec![
        screen(
            "faenas",
            "Gestión de Faenas",
            "idfaena",
            columns(&[
                ("ID", "idfaena"),
                ("Nombre", "nombrefaena"),
                ("Ubicación", "ubicacion"),
                ("Contacto", "contacto"),
                ("Activa", "activa"),
            ]),
            vec![
                FieldDescriptor::text("nombrefaena", "Nombre de la Faena"),
                FieldDescriptor::text("ubicacion", "Ubicación").optional(),
                FieldDescriptor::text("contacto", "Contacto").optional(),
                FieldDescriptor::text("telefono", "Teléfono").optional(),
                FieldDescriptor::new("activa", "Activa", FieldKind::Checkbox).with_default(true),
            ],
        ),
        screen(
            "tipos-equipo",
            "Tipos de Equipo",
            "idtipoequipo",
            columns(&[
                ("ID", "idtipoequipo"),
                ("Nombre del Tipo", "nombretipo"),
                ("Descripción", "descripciontipo"),
            ]),
            vec![
                FieldDescriptor::text("nombretipo", "Nombre del Tipo de Equipo"),
                FieldDescriptor::text("descripciontipo", "Descripción").optional(),
            ],
        ),
        screen(
            "estados-equipo",
            "Estados de Equipo",
            "idestatus",
            columns(&[
                ("ID", "idestatus"),
                ("Nombre del Estado", "nombreestado"),
                ("Descripción", "descripcion"),
            ]),
            vec![
                FieldDescriptor::text("nombreestado", "Nombre del Estado"),
                FieldDescriptor::new("descripcion", "Descripción", FieldKind::Textarea),
            ],
        ),
        screen(
            "tipos-tarea",
            "Tipos de Tarea",
            "idtipotarea",
            columns(&[
                ("ID", "idtipotarea"),
                ("Nombre del Tipo de Tarea", "nombretipotarea"),
                ("Descripción", "descripcion"),
            ]),
            vec![
                FieldDescriptor::text("nombretipotarea", "Nombre del Tipo de Tarea"),
                FieldDescriptor::text("descripcion", "Descripción").optional(),
            ],
        ),
        screen(
            "equipos",
            "Gestión de Equipos Móviles",
            "idequipo",
            columns(&[
                ("Código", "codigoequipo"),
                ("Descripción", "descripcion"),
                ("Faena", "nombrefaena"),
                ("Tipo", "nombretipoequipo"),
                ("Estado", "nombreestado"),
                ("Horómetro", "horometroactual"),
            ]),
            vec![
                FieldDescriptor::text("codigoequipo", "Código del Equipo"),
                FieldDescriptor::new("descripcion", "Descripción", FieldKind::Textarea),
                FieldDescriptor::select(
                    "idfaena",
                    "Faena",
                    OptionsSource::new("faenas", "idfaena", "nombrefaena"),
                ),
                FieldDescriptor::select(
                    "idtipoequipo",
                    "Tipo de Equipo",
                    OptionsSource::new("tipos-equipo", "idtipoequipo", "nombretipo"),
                ),
                FieldDescriptor::select(
                    "idestatus",
                    "Estado",
                    OptionsSource::new("estados-equipo", "idestatus", "nombreestado"),
                ),
                FieldDescriptor::new("horometroactual", "Horómetro Actual", FieldKind::Number)
                    .optional(),
            ],
        ),
    ]
}

/// Built-ins merged with the config file's screens, in catalog order.
pub fn catalog(config: &Config) -> Vec<ScreenSpec> {
    let mut screens: Vec<ScreenSpec> = builtin()
        .into_iter()
        .map(|spec| config.screen(&spec.name).cloned().unwrap_or(spec))
        .collect();
    for extra in &config.screens {
        if !screens.iter().any(|s| s.name == extra.name) {
            screens.push(extra.clone());
        }
    }
    screens
}

pub fn find(config: &Config, name: &str) -> Result<ScreenSpec, CliError> {
    catalog(config)
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "screen".into(),
            identifier: name.into(),
            list_command: "screens list".into(),
        })
}
