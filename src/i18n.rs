//! display strings for the dashboard, spanish and english

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub fn tag(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translations {
    // navigation
    pub active_devices: &'static str,
    pub settings: &'static str,
    pub profile: &'static str,
    pub toggle_theme: &'static str,
    pub change_language: &'static str,

    // titles
    pub temperature: &'static str,
    pub humidity: &'static str,
    pub temperature_chart: &'static str,
    pub humidity_chart: &'static str,
    pub temperature_readings: &'static str,
    pub humidity_readings: &'static str,
    pub welcome_message: &'static str,

    // stats
    pub average: &'static str,
    pub median: &'static str,
    pub mode: &'static str,
    pub range: &'static str,
    pub last_update: &'static str,

    // table
    pub time: &'static str,
    pub value: &'static str,

    // sidebar
    pub principal: &'static str,
    pub devices: &'static str,
    pub statistics: &'static str,

    // profile
    pub user_profile: &'static str,
    pub role: &'static str,
    pub email: &'static str,

    // errors
    pub error: &'static str,
    pub loading: &'static str,
    pub no_data: &'static str,

    // pot state
    pub soil_state: &'static str,
    pub dry: &'static str,
    pub optimal: &'static str,
    pub wet: &'static str,
    pub no_sensor_selected: &'static str,
}

static ES: Translations = Translations {
    active_devices: "Sensores activos",
    settings: "Configuración",
    profile: "Perfil",
    toggle_theme: "Cambiar tema",
    change_language: "Cambiar idioma",

    temperature: "Temperatura",
    humidity: "Humedad",
    temperature_chart: "Gráfico de Temperatura",
    humidity_chart: "Gráfico de Humedad",
    temperature_readings: "Temperatura (últimas 15 lecturas)",
    humidity_readings: "Humedad (últimas 15 lecturas)",
    welcome_message: "¡Bienvenido al Panel de Control!",

    average: "Promedio",
    median: "Mediana",
    mode: "Moda",
    range: "Rango",
    last_update: "Última actualización",

    time: "Hora",
    value: "Valor",

    principal: "Principal",
    devices: "Dispositivos",
    statistics: "Estadísticas",

    user_profile: "Perfil de Usuario",
    role: "Rol",
    email: "Correo",

    error: "Error",
    loading: "Cargando...",
    no_data: "No hay datos disponibles",

    soil_state: "Estado del suelo",
    dry: "Seco",
    optimal: "Óptimo",
    wet: "Muy húmedo",
    no_sensor_selected: "Ningún sensor seleccionado",
};

static EN: Translations = Translations {
    active_devices: "Active Devices",
    settings: "Settings",
    profile: "Profile",
    toggle_theme: "Toggle theme",
    change_language: "Change language",

    temperature: "Temperature",
    humidity: "Humidity",
    temperature_chart: "Temperature Chart",
    humidity_chart: "Humidity Chart",
    temperature_readings: "Temperature (last 15 readings)",
    humidity_readings: "Humidity (last 15 readings)",
    welcome_message: "Welcome to the Dashboard!",

    average: "Average",
    median: "Median",
    mode: "Mode",
    range: "Range",
    last_update: "Last update",

    time: "Time",
    value: "Value",

    principal: "Main",
    devices: "Devices",
    statistics: "Statistics",

    user_profile: "User Profile",
    role: "Role",
    email: "Email",

    error: "Error",
    loading: "Loading...",
    no_data: "No data available",

    soil_state: "Soil state",
    dry: "Dry",
    optimal: "Optimal",
    wet: "Too wet",
    no_sensor_selected: "No sensor selected",
};

pub fn translations(language: Language) -> &'static Translations {
    match language {
        Language::Es => &ES,
        Language::En => &EN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_tables_resolve() {
        assert_eq!(translations(Language::Es).average, "Promedio");
        assert_eq!(translations(Language::En).no_data, "No data available");
    }

    #[test]
    fn language_tags() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::default().tag(), "es");
    }

    #[test]
    fn serializes_with_frontend_keys() {
        let json = serde_json::to_value(translations(Language::En)).expect("serialize");
        assert_eq!(json["temperatureReadings"], "Temperature (last 15 readings)");
        assert_eq!(json["noData"], "No data available");
    }
}
