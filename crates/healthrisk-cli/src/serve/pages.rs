//! maud templates for the risk assessment form.
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};

use healthrisk_classifiers::serving::{PatientRecord, Prediction, YesNo, GENDERS};

pub const RISK_FACTORS_IMAGE: &str =
    "https://www.cdc.gov/chronicdisease/images/infographics/risk-factors-infographic-800px.jpg";

const STYLE: &str = "
body { font-family: sans-serif; margin: 0; display: flex; color: #222; }
aside { width: 280px; background: #f0f2f6; padding: 1.5em; min-height: 100vh; box-sizing: border-box; }
main { flex: 1; padding: 1.5em 2.5em; }
.columns { display: flex; gap: 2em; }
.columns fieldset { flex: 1; border: none; padding: 0; }
label { display: block; margin: .6em 0 .2em; font-size: .9em; }
input, select { width: 100%; padding: 4px; box-sizing: border-box; }
button { margin-top: 1em; padding: .5em 1.2em; }
.banner { padding: .8em 1em; border-radius: 4px; margin: 1em 0; }
.high { background: #fde8e8; color: #8a1c1c; }
.low { background: #e6f4ea; color: #1e5631; }
.warning { background: #fff4e5; color: #7a4b00; }
table.raw td, table.raw th { border: 1px solid #ccc; padding: 2px 8px; }
code { word-break: break-all; }
";

/// Everything a rendered page may show besides the form itself.
pub enum Outcome {
    None,
    Predicted(Prediction),
    Error(String),
}

/// Sidebar content.
pub struct ModelInfo<'a> {
    pub model_type: &'a str,
    pub load_path: Option<&'a Path>,
}

struct NumberField {
    name: &'static str,
    label: &'static str,
    min: f64,
    max: f64,
    step: f64,
}

const fn field(name: &'static str, label: &'static str, min: f64, max: f64, step: f64) -> NumberField {
    NumberField {
        name,
        label,
        min,
        max,
        step,
    }
}

const FIRST_COLUMN: [NumberField; 4] = [
    field("age", "Age (years)", 18.0, 100.0, 1.0),
    field("bmi", "BMI (kg/m\u{b2})", 15.0, 50.0, 0.1),
    field("daily_steps", "Daily Steps", 0.0, 30000.0, 1.0),
    field("sleep_hours", "Sleep Hours", 3.0, 10.0, 0.1),
];

const SECOND_COLUMN: [NumberField; 4] = [
    field("water_intake_l", "Water Intake (Liters)", 0.0, 5.0, 0.01),
    field("calories_consumed", "Calories Consumed", 1000.0, 5000.0, 1.0),
    field("resting_hr", "Resting Heart Rate (bpm)", 40.0, 120.0, 1.0),
    field("cholesterol", "Cholesterol (mg/dL)", 150.0, 300.0, 1.0),
];

const THIRD_COLUMN: [NumberField; 2] = [
    field("systolic_bp", "Systolic BP (mmHg)", 90.0, 200.0, 1.0),
    field("diastolic_bp", "Diastolic BP (mmHg)", 60.0, 130.0, 1.0),
];

fn current_value(record: &PatientRecord, name: &str) -> String {
    record
        .display_values()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
        .unwrap_or_default()
}

fn number_inputs(fields: &[NumberField], record: &PatientRecord) -> Markup {
    html! {
        @for f in fields {
            label for=(f.name) { (f.label) }
            input type="number" id=(f.name) name=(f.name) required
                min=(f.min) max=(f.max) step=(f.step) value=(current_value(record, f.name));
        }
    }
}

fn yes_no_select(name: &str, label: &str, selected: YesNo) -> Markup {
    html! {
        label for=(name) { (label) }
        select id=(name) name=(name) {
            @for choice in [YesNo::No, YesNo::Yes] {
                option value=(choice.as_str()) selected[choice == selected] { (choice.as_str()) }
            }
        }
    }
}

fn sidebar(info: &ModelInfo<'_>) -> Markup {
    html! {
        aside {
            h3 { "Model Details" }
            p { strong { "Model Type: " } code { (info.model_type) } }
            @if let Some(path) = info.load_path {
                p { strong { "Load Path: " } code { (path.display().to_string()) } }
            }
            p {
                "This model was loaded from the local experiment tracking store."
            }
            p {
                "It was selected for its high " strong { "Recall" }
                " (sensitivity) score, minimizing false negatives."
            }
        }
    }
}

fn risk_form(record: &PatientRecord) -> Markup {
    html! {
        form method="post" action="/predict" {
            h2 { "Patient Health Metrics" }
            div class="columns" {
                fieldset { (number_inputs(&FIRST_COLUMN, record)) }
                fieldset { (number_inputs(&SECOND_COLUMN, record)) }
                fieldset {
                    (number_inputs(&THIRD_COLUMN, record))
                    label for="gender" { "Gender" }
                    select id="gender" name="gender" {
                        @for g in GENDERS {
                            option value=(g) selected[record.gender == g] { (g) }
                        }
                    }
                    (yes_no_select("family_history", "Family History of Disease", record.family_history))
                    (yes_no_select("smoker", "Smoker", record.smoker))
                    (yes_no_select("alcohol", "Alcohol Consumption", record.alcohol))
                }
            }
            button type="submit" { "Predict Risk Score" }
        }
    }
}

fn result_block(prediction: &Prediction, record: &PatientRecord) -> Markup {
    html! {
        h2 { "Prediction Result" }
        @if prediction.is_high_risk() {
            div class="banner high" { (prediction.headline()) }
            p {
                "The model suggests this patient is at " strong { "high risk" }
                " of disease. Further clinical evaluation is recommended."
            }
            figure {
                img src=(RISK_FACTORS_IMAGE) alt="Common Risk Factors" width="100%";
                figcaption { "Common Risk Factors" }
            }
        } @else {
            div class="banner low" { (prediction.headline()) }
            p {
                "The model suggests this patient is at " strong { "low risk" }
                ". Continue monitoring health metrics."
            }
        }
        details {
            summary { "Show Raw Input Data" }
            table class="raw" {
                tr {
                    @for (name, _) in record.display_values() { th { (name) } }
                }
                tr {
                    @for (_, value) in record.display_values() { td { (value) } }
                }
            }
        }
    }
}

fn layout(sidebar_markup: Markup, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Disease Risk Predictor" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                (sidebar_markup)
                main {
                    h1 { "Healthcare Disease Risk Assessment" }
                    p {
                        "Use the input fields below to assess the patient's likelihood of "
                        strong { "Disease Risk" } " (1) based on their lifestyle and health metrics."
                    }
                    (body)
                }
            }
        }
    }
}

/// Form page, with an optional prediction or error below the form.
pub fn form_page(info: &ModelInfo<'_>, record: &PatientRecord, outcome: &Outcome) -> Markup {
    let body = html! {
        (risk_form(record))
        @match outcome {
            Outcome::None => {}
            Outcome::Predicted(prediction) => { (result_block(prediction, record)) }
            Outcome::Error(message) => { div class="banner warning" { (message) } }
        }
    };
    layout(sidebar(info), body)
}

/// Page shown while no model can be loaded.
pub fn unavailable_page(model_type: &str, error: &str) -> Markup {
    let info = ModelInfo {
        model_type,
        load_path: None,
    };
    let body = html! {
        div class="banner warning" { (error) }
        div class="banner warning" {
            "Prediction functionality is disabled until a model is successfully loaded."
        }
    };
    layout(sidebar(&info), body)
}
