//! Tabla estática de departamentos (datos de referencia, sin lógica).
use super::definition::{FieldDefinition, FieldType, StepDefinition};
use crate::constants::STEP_COUNT;
use crate::model::StepCode;
use FieldType::{Date, Number, Text, Textarea};

const fn field(name: &'static str, label: &'static str, field_type: FieldType, required: bool) -> FieldDefinition {
    FieldDefinition { name,
                      label,
                      field_type,
                      required,
                      options: &[] }
}

const fn select(name: &'static str, label: &'static str, options: &'static [&'static str]) -> FieldDefinition {
    FieldDefinition { name,
                      label,
                      field_type: FieldType::Select,
                      required: true,
                      options }
}

const OK_NOT_OK: &[&str] = &["OK", "NOT OK"];

const GENERAL_DETAILS: &[FieldDefinition] = &[field("trialNo", "Trial No", Text, true),
                                              field("partName", "Part Name", Text, true),
                                              field("dateOfSampling", "Date of Sampling", Date, true),
                                              field("noOfMoulds", "No. of Moulds", Number, true),
                                              select("disaFoundry", "DISA/FOUNDRY", &["A", "B"]),
                                              field("reasonForSampling", "Reason for Sampling", Textarea, true),
                                              field("hod", "HOD", Text, true)];

const MELTING: &[FieldDefinition] = &[field("heatCode", "Heat Code", Text, true),
                                      field("carbon", "Carbon (%)", Number, true),
                                      field("silicon", "Silicon (%)", Number, true),
                                      field("manganese", "Manganese (%)", Number, true),
                                      field("phosphorous", "Phosphorous (%)", Number, true),
                                      field("sulphur", "Sulphur (%)", Number, true),
                                      field("magnesium", "Magnesium (%)", Number, true),
                                      field("copper", "Copper (%)", Number, true),
                                      field("chromium", "Chromium (%)", Number, true),
                                      field("pouringTemp", "Pouring Temperature (°C)", Number, true),
                                      field("inoculationStream", "Inoculation - Stream (gms)", Number, true),
                                      field("inoculationInmould", "Inoculation - Inmould (gms)", Number, true),
                                      field("pouringTime", "Pouring Time (Sec)", Number, true),
                                      field("ppCode", "PP Code", Text, true),
                                      field("otherRemarks", "Other Remarks", Textarea, false),
                                      field("hod", "HOD", Text, true)];

const SAND_PROPERTIES: &[FieldDefinition] = &[field("tClay", "T.Clay", Number, true),
                                              field("aClay", "A.Clay", Number, true),
                                              field("vcm", "VCM", Number, true),
                                              field("loi", "LOI", Number, true),
                                              field("afs", "AFS", Number, true),
                                              field("gcs", "G.C.S", Number, true),
                                              field("moi", "MOI", Number, true),
                                              field("compactability", "Compactability", Number, true),
                                              field("perm", "Perm", Number, true),
                                              field("otherRemarks", "Other Remarks", Textarea, false),
                                              field("hod", "HOD", Text, true)];

const MOULDING: &[FieldDefinition] = &[field("mouldThickness", "Mould Thickness", Number, true),
                                       field("compressability", "Compressability", Number, true),
                                       field("squeezePressure", "Squeeze Pressure", Number, true),
                                       field("mouldHardness", "Mould Hardness", Number, true),
                                       field("otherRemarks", "Other Remarks", Textarea, false),
                                       field("hod", "HOD", Text, true)];

const METALLURGICAL_INSPECTION: &[FieldDefinition] =
    &[select("microExamination", "Micro Examination Result", OK_NOT_OK),
      select("tensileTest", "Tensile Strength, Yield Strength & Elongation", OK_NOT_OK),
      select("hardnessTest", "Hardness", OK_NOT_OK),
      field("ndtInspection", "NDT Inspection Analysis", Textarea, true),
      field("refNo", "Ref.NO (Trial No: and date)", Text, true),
      field("hod", "HOD", Text, true)];

const FETTLING_AND_INSPECTION: &[FieldDefinition] =
    &[field("visualRemarks", "Visual Remarks on Degating, Flash, Fines, Inspection", Textarea, true),
      field("quantityInspected", "Quantity Inspected", Number, true),
      field("quantityRejected", "Quantity Rejected", Number, true),
      field("reasonForRejection", "Reason for Rejection", Textarea, true),
      field("visualHod", "HOD (Visual Inspection)", Text, true),
      field("dimensionalRemarks", "Dimensional Inspection Remarks", Textarea, true),
      field("bunchWeight", "Bunch Wt. (or) Casting Weight", Number, true),
      field("dimensionalHod", "HOD (Dimensional Inspection)", Text, true),
      field("quantityReceived", "Quantity Received (M/C Shop)", Number, true),
      field("quantityMachined", "Quantity Machined", Number, true),
      field("quantityRejectedMc", "Quantity Rejected (M/C Shop)", Number, true),
      field("reasonForRejectionMc", "Reason for Rejection (M/C Shop)", Textarea, true),
      field("dimensionalReportRemarks", "Dimensional Report Remarks", Textarea, true),
      field("mcShopHod", "HOD (M/C Shop)", Text, true),
      field("refNo", "Ref.NO (Trial No: and date)", Text, true)];

pub(super) static DEPARTMENTS: [StepDefinition; STEP_COUNT] =
    [StepDefinition { code: StepCode::Dpt1,
                      name: "Department 1 - General Details",
                      order_index: 1,
                      fields: GENERAL_DETAILS },
     StepDefinition { code: StepCode::Dpt2,
                      name: "Department 2 - Melting",
                      order_index: 2,
                      fields: MELTING },
     StepDefinition { code: StepCode::Dpt3,
                      name: "Department 3 - Sand Properties",
                      order_index: 3,
                      fields: SAND_PROPERTIES },
     StepDefinition { code: StepCode::Dpt4,
                      name: "Department 4 - Moulding",
                      order_index: 4,
                      fields: MOULDING },
     StepDefinition { code: StepCode::Dpt5,
                      name: "Department 5 - Metallurgical Inspection",
                      order_index: 5,
                      fields: METALLURGICAL_INSPECTION },
     StepDefinition { code: StepCode::Dpt6,
                      name: "Department 6 - Fettling & Inspection",
                      order_index: 6,
                      fields: FETTLING_AND_INSPECTION }];
