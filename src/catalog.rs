//! Fixed reference data for the demo dataset
//! Department hierarchy, usage weights, role data caps and name pools

use std::collections::HashMap;
use std::sync::LazyLock;

pub const COMPANY_NAME: &str = "Empresa X";

/// Departments with the roles each one may hire, in insertion order
pub const HIERARCHY: &[(&str, &[&str])] = &[
    ("Vendas", &["Vendedor", "Supervisor", "Gerente"]),
    ("Operações", &["Tecnico", "Supervisor", "Gerente"]),
    ("Suporte Técnico", &["Tecnico", "Supervisor"]),
    ("Financeiro", &["Supervisor", "Gerente"]),
    ("Administrativo", &["Supervisor", "Gerente"]),
    ("Diretoria", &["Gerente"]),
];

pub const ROLES: &[&str] = &["Vendedor", "Supervisor", "Gerente", "Tecnico"];
pub const DEVICES: &[&str] = &["Smartphone", "Tablet", "Roteador", "IoT"];
pub const STATUSES: &[&str] = &["Inativo", "Ativo", "Suspenso"];
pub const EVENTS: &[&str] = &["Nenhum", "Roaming", "Bloqueio", "Excesso de dados"];
pub const ALERTS: &[bool] = &[false, true];

/// Cap for roles missing from `ROLE_DATA_CAPS`
pub const DEFAULT_DATA_CAP_GB: f64 = 50.0;

/// Consumption multiplier per department
pub static DEPARTMENT_WEIGHTS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("Vendas", 1.8);
    m.insert("Operações", 1.2);
    m.insert("Suporte Técnico", 1.6);
    m.insert("Financeiro", 0.7);
    m.insert("Administrativo", 0.8);
    m.insert("Diretoria", 1.3);
    m
});

/// Consumption multiplier per role
pub static ROLE_WEIGHTS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("Vendedor", 1.6);
    m.insert("Supervisor", 1.2);
    m.insert("Gerente", 1.1);
    m.insert("Tecnico", 1.4);
    m
});

/// Contracted monthly data allowance per role, in GB
pub static ROLE_DATA_CAPS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("Vendedor", 30.0);
    m.insert("Supervisor", 80.0);
    m.insert("Gerente", 150.0);
    m.insert("Tecnico", 120.0);
    m
});

pub const FIRST_NAMES: &[&str] = &[
    "Ana", "Beatriz", "Bruno", "Camila", "Carlos", "Daniela", "Eduardo", "Fernanda",
    "Gabriel", "Helena", "Igor", "Juliana", "Lucas", "Mariana", "Nicolas", "Patrícia",
    "Rafael", "Sofia", "Thiago", "Vitória",
];

pub const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Costa", "Ferreira", "Gomes", "Lima", "Martins",
    "Oliveira", "Pereira", "Ribeiro", "Rocha", "Santos", "Silva", "Souza",
];

pub const CITIES: &[&str] = &[
    "São Paulo", "Rio de Janeiro", "Belo Horizonte", "Curitiba", "Porto Alegre",
    "Salvador", "Recife", "Fortaleza", "Brasília", "Campinas", "Florianópolis", "Goiânia",
];

pub fn allowed_roles(department: &str) -> Option<&'static [&'static str]> {
    HIERARCHY
        .iter()
        .find(|(name, _)| *name == department)
        .map(|(_, roles)| *roles)
}

pub fn department_weight(department: &str) -> f64 {
    DEPARTMENT_WEIGHTS.get(department).copied().unwrap_or(1.0)
}

pub fn role_weight(role: &str) -> f64 {
    ROLE_WEIGHTS.get(role).copied().unwrap_or(1.0)
}

pub fn data_cap_gb(role: &str) -> f64 {
    ROLE_DATA_CAPS
        .get(role)
        .copied()
        .unwrap_or(DEFAULT_DATA_CAP_GB)
}
