// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs (email unique, rôle fixé à l'inscription)
//   - etudiant / entreprise / administration : Profils propres à chaque rôle
//   - offre : Offres de stage publiées par les entreprises
//   - candidature : Candidatures des étudiants (en_attente/acceptee/rejetee)
//   - convention : Conventions tripartites, id = identifiant du stage
//   - rapport : Rapport de stage déposé par l'étudiant, noté /20
//   - evaluation : Évaluation du stagiaire par l'entreprise (/5)
//   - dto : Data Transfer Objects pour les réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les statuts sont des chaînes en base (DeriveActiveEnum)
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod health;
pub mod users;
pub mod etudiant;
pub mod entreprise;
pub mod administration;
pub mod offre;
pub mod candidature;
pub mod convention;
pub mod rapport;
pub mod evaluation;
pub mod dto;
