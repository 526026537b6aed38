// query_flow
//
// Pasos del flujo de consultas. El orden lo fija el coordinador:
// generar SQL (sólo lenguaje natural) → ejecutar → publicar.
pub mod steps;
